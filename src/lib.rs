pub mod classifier;
pub mod config;
pub mod fixup;
pub mod frontmatter;
pub mod lang;
pub mod models;
pub mod navigation;
pub mod pipeline;
pub mod progress;
pub mod quality;
pub mod sanitize;
pub mod terminology;
pub mod textutil;
