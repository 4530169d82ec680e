// The dependency on mavlink-bindgen exists only to unify its `emit-extensions`
// feature with the copy mavlink's own build script uses, so generated messages
// carry extension fields such as `COMMAND_ACK.progress`.
fn main() {
    println!("cargo::rerun-if-changed=build.rs");
}
