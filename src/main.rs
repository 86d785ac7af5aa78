fn main() -> std::process::ExitCode {
    spotify_auth_lib::run()
}
