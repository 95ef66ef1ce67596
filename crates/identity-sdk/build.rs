//! Compiles the VC service protobuf definitions into Rust code.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["proto/vc_service.proto"], &["proto/"])?;

    println!("cargo:rerun-if-changed=proto/");

    Ok(())
}
