//! Linux backend built on procfs
//!
//! Memory comes from `/proc/<pid>/mem`, modules from `/proc/<pid>/maps`
//! and the pointer width from the ELF class of `/proc/<pid>/exe`.

use super::{ProcessKey, ProcessMemory, ProcessOpener};
use crate::core::types::{
    Address, AddressWidth, MemoryError, MemoryResult, ModuleEntry, ProcessId, ProcessInfo,
};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const ELF_CLASS_32: u8 = 1;
const ELF_CLASS_64: u8 = 2;

/// An opened Linux process
#[derive(Debug)]
pub struct ProcfsProcess {
    key: ProcessKey,
    pid: ProcessId,
    root: PathBuf,
    mem: File,
}

impl ProcfsProcess {
    /// Opens `/proc/<pid>/mem` for reading
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let root = PathBuf::from(format!("/proc/{}", pid));
        if !root.exists() {
            return Err(MemoryError::ProcessNotFound(format!("PID: {}", pid)));
        }

        let mem = File::open(root.join("mem")).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => MemoryError::access_denied(pid, e.to_string()),
            io::ErrorKind::NotFound => MemoryError::ProcessNotFound(format!("PID: {}", pid)),
            _ => MemoryError::IoError(e),
        })?;

        Ok(ProcfsProcess {
            key: ProcessKey::next(),
            pid,
            root,
            mem,
        })
    }
}

impl ProcessMemory for ProcfsProcess {
    fn key(&self) -> ProcessKey {
        self.key
    }

    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn read_bytes(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        self.mem
            .read_exact_at(buffer, address.as_u64())
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => MemoryError::read_failed(
                    address,
                    format!("short read, wanted {} bytes", buffer.len()),
                ),
                _ => MemoryError::read_failed(address, e.to_string()),
            })
    }

    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleEntry>> {
        let maps = fs::read_to_string(self.root.join("maps"))
            .map_err(|e| MemoryError::enumeration_failed(self.pid, e.to_string()))?;
        Ok(parse_maps(&maps))
    }

    fn detect_address_width(&self) -> MemoryResult<AddressWidth> {
        let exe = self.root.join("exe");
        elf_width(&exe).map_err(|reason| {
            MemoryError::WidthUnknown(format!("pid {} ({}): {}", self.pid, exe.display(), reason))
        })
    }
}

/// Extracts file-backed modules from the text of a `maps` file.
///
/// A module is the first mapping seen for each path; its start address is
/// the module base. Anonymous and pseudo mappings (`[heap]`, `[vdso]`, ...)
/// are skipped.
pub fn parse_maps(maps: &str) -> Vec<ModuleEntry> {
    let mut seen = HashSet::new();
    let mut modules = Vec::new();

    for line in maps.lines() {
        // start-end perms offset dev inode path
        let Some((range, _)) = line.split_once(char::is_whitespace) else { continue };
        let path = line_path(line);
        if !path.starts_with('/') {
            continue;
        }

        let Some((start, _)) = range.split_once('-') else { continue };
        let Ok(start) = u64::from_str_radix(start, 16) else { continue };

        if seen.insert(path.to_string()) {
            let name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string());
            modules.push(ModuleEntry::new(name, Address::new(start)));
        }
    }

    modules
}

// Path column may contain spaces, so take everything after the fifth field.
fn line_path(line: &str) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..5 {
        match rest.find(char::is_whitespace) {
            Some(end) => rest = rest[end..].trim_start(),
            None => return "",
        }
    }
    rest.trim_end()
}

fn elf_width(path: &Path) -> Result<AddressWidth, String> {
    let mut header = [0u8; 5];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .map_err(|e| e.to_string())?;

    if header[..4] != ELF_MAGIC {
        return Err("not an ELF image".to_string());
    }
    match header[4] {
        ELF_CLASS_32 => Ok(AddressWidth::Bits32),
        ELF_CLASS_64 => Ok(AddressWidth::Bits64),
        other => Err(format!("unknown ELF class {}", other)),
    }
}

/// Opens procfs-backed processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsOpener;

impl ProcfsOpener {
    /// Creates a new opener
    pub fn new() -> Self {
        ProcfsOpener
    }
}

impl ProcessOpener for ProcfsOpener {
    fn open_process(&self, pid: ProcessId) -> MemoryResult<Arc<dyn ProcessMemory>> {
        let process = ProcfsProcess::open(pid)?;
        debug!(pid, key = %process.key(), "opened process");
        Ok(Arc::new(process) as Arc<dyn ProcessMemory>)
    }

    /// Every process whose executable link is readable by us
    fn list_candidate_processes(&self) -> MemoryResult<Vec<ProcessInfo>> {
        let mut processes = Vec::new();

        for entry in fs::read_dir("/proc")? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<ProcessId>().ok())
            else {
                continue;
            };

            let Ok(exe) = fs::read_link(entry.path().join("exe")) else {
                continue;
            };
            let filename = exe
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if filename.is_empty() {
                continue;
            }
            processes.push(ProcessInfo::new(pid, filename));
        }

        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }
}
