//! Content generation services.
//!
//! Each module owns its prompts and checks the model's output against the
//! shape the API promises. Nothing here touches the database; handlers
//! persist results after generation finishes.

pub mod aida;
pub mod audio;
pub mod concept_map;
pub mod feynman;
pub mod flashcards;
pub mod pomodoro;
pub mod quiz;
pub mod video;
pub mod voice_tutor;
