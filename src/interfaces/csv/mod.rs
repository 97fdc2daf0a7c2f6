pub mod signal_reader;
