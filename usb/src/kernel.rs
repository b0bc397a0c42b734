use crate::config::KernelCheck;
use log::debug;

/// Linux releases from here on drive these devices without the firmware
/// minimums older kernels need.
pub const RECENT_KERNEL: KernelVersion = KernelVersion(2, 6, 28);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion(pub u32, pub u32, pub u32);

impl KernelVersion {
    /// Reads `major.minor.revision` from a release string such as
    /// `6.8.0-45-generic`. Missing or non-numeric components count as zero.
    pub fn parse(release: &str) -> Self {
        let mut parts = release
            .split(['.', '-'])
            .filter(|part| !part.is_empty())
            .map(leading_number);

        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        let revision = parts.next().unwrap_or(0);
        KernelVersion(major, minor, revision)
    }

    pub fn is_recent(&self) -> bool {
        *self >= RECENT_KERNEL
    }
}

fn leading_number(part: &str) -> u32 {
    let digits = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..digits].parse().unwrap_or(0)
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub fn host_is_recent() -> bool {
            match nix::sys::utsname::uname() {
                Ok(uts) => {
                    let release = uts.release().to_string_lossy();
                    let version = KernelVersion::parse(&release);
                    debug!("Host kernel {} parsed as {:?}", release, version);
                    version.is_recent()
                }
                Err(error) => {
                    log::warn!("Unable to read the kernel release: {}", error);
                    false
                }
            }
        }
    } else {
        // Only Linux kernels have had trouble with these devices.
        pub fn host_is_recent() -> bool {
            debug!("Non-Linux host, skipping the kernel check");
            true
        }
    }
}

impl KernelCheck {
    pub(crate) fn is_recent(&self) -> bool {
        match self {
            KernelCheck::Detect => host_is_recent(),
            KernelCheck::AssumeRecent => true,
            KernelCheck::AssumeOutdated => false,
        }
    }
}
