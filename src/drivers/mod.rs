pub mod ata;
pub mod drive;
