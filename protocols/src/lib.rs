//! Wire formats of the scan backends NetDetective drives.

pub mod nmap;
