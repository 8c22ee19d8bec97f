pub mod generic_drive;
