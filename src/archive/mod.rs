mod descriptor;
mod end_record;
mod mount;
mod vfs;

pub use descriptor::Descriptor;
pub use end_record::{ArchiveSlice, EndRecord, END_RECORD_SIGNATURE, END_RECORD_SIZE};
pub use mount::{basename, basename_with, ArchiveMount, Mounted};
pub use vfs::{VirtualArchive, MAX_PREALLOCATION, MOUNT_ROOT};
