/// Colorized panic messages with a backtrace, installed before anything else runs
pub fn setup() {
    color_backtrace::install();
}
