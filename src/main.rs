fn main() -> std::process::ExitCode {
    livestreams_lib::run()
}
