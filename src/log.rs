//! Module with the functions used to print timestamped, coloured diagnostics.
//!
//! Messages may carry their own `color_print` markup (usually `<bold>` around
//! values), built with `cformat!` at the call site.

use chrono::Local;
use color_print::cprintln;

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Function that prints an informational message.
pub fn info(message: &str) {
    cprintln!("<blue>[{}]</blue> {}", timestamp(), message);
}

/// Function that prints a warning.
pub fn warn(message: &str) {
    cprintln!("<yellow>[{}]</yellow> <yellow>{}</yellow>", timestamp(), message);
}

/// Function that prints an error.
pub fn error(message: &str) {
    cprintln!("<red>[{}]</red> <red>{}</red>", timestamp(), message);
}

/// Function that prints a successful event.
pub fn success(message: &str) {
    cprintln!("<green>[{}]</green> <green>{}</green>", timestamp(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_date_and_time() {
        let stamp = timestamp();
        assert_eq!(stamp.len(), "2006-01-02 15:04:05".len());
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
    }
}
