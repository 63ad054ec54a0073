pub mod toml_loader;

pub use toml_loader::{load_all_form_definitions, load_form_definition};
