pub mod audio_route;
pub mod call_table;
pub mod command_queue;
pub mod indicators;
