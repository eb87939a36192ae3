//! Generates the tonic client/server stubs and prost message types
//! from `proto/federator.proto` via the standard `tonic-build`/
//! `prost-build` pairing.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile(&["proto/federator.proto"], &["proto"])?;
    println!("cargo:rerun-if-changed=proto/federator.proto");
    Ok(())
}
