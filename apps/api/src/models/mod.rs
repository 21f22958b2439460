pub mod ad;
pub mod history;
