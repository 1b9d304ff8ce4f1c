fn main() {
    cookie_profiles::cli::run();
}
