pub mod controls;
pub mod debug;
pub mod results_grid;
pub mod text_input;
pub mod text_input_common;
