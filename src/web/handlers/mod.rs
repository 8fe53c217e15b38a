pub mod demo;

pub use demo::{build_demo_tree, DemoControls, DEMO_LAYOUT, EVENT_FIELD};
