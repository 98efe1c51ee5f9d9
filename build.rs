fn main() {
    // ESP-IDF environment is only needed for the on-target binary; host
    // builds run with `--no-default-features` and skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
