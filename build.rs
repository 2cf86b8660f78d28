#[cfg(not(any(feature = "rustls-marker", feature = "native-marker")))]
compile_error!(
    "Either the `rustls` or `native` feature must be \
    selected to let lavasnek talk to secured Lavalink nodes.\n\
    - `rustls` uses Rustls, a pure Rust TLS implementation.\n\
    - `native` uses SChannel on Windows, Secure Transport on macOS, \
    and OpenSSL on other platforms.\n\
    If you are unsure, go with `rustls`."
);

fn main() {}
