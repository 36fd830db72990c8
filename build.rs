use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

// (name, default) pairs turned into `pub const NAME: usize` in $OUT_DIR/config.rs.
static CONFIGS: &[(&str, usize)] = &[
    ("EVENT_QUEUE_DEPTH", 16),
    ("MAX_MESSAGE_LEN", 1024),
    ("MAX_ADDRESS_LIST", 4),
];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest = Path::new(&out_dir).join("config.rs");
    let mut out = File::create(dest).unwrap();

    for (name, default) in CONFIGS {
        let var = format!("DHCPC_{}", name);
        println!("cargo:rerun-if-env-changed={}", var);
        let value = match env::var(&var) {
            Ok(value) => value
                .parse::<usize>()
                .unwrap_or_else(|_| panic!("{} must be an unsigned integer", var)),
            Err(_) => *default,
        };
        writeln!(out, "pub const {}: usize = {};", name, value).unwrap();
    }
    println!("cargo:rerun-if-changed=build.rs");
}
