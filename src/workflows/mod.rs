pub mod correlator;
pub mod episode;
pub mod orchestrator;
pub mod renamer;
pub mod selection;
