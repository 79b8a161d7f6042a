// Compiles the Slint UI definitions when the `gui` feature is enabled.

fn main() {
    #[cfg(feature = "gui")]
    slint_build::compile("ui/main.slint").expect("Slint UI compilation failed");
}
