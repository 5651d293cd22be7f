use std::io::Result;

const PROTOS: &[&str] = &["proto/common.proto", "proto/client.proto", "proto/server.proto"];

fn main() -> Result<()> {
    for proto in PROTOS {
        println!("cargo:rerun-if-changed={}", proto);
    }
    prost_build::compile_protos(PROTOS, &["proto/"])?;
    Ok(())
}
