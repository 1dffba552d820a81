pub mod robocast_rust_sdk;
