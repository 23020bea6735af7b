//! Output stage: archive rotation and publishing of the live page.
//!
//! # Output Structure
//!
//! ```text
//! site_dir/
//! ├── index.html          # today's page
//! └── archive/
//!     ├── 2024-03-09.html # write-once entries, one per date
//!     └── 2024-03-10.html
//! ```

pub mod archive;
