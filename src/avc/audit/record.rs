/*!
 * Audit Records
 * Auxiliary request data and the rendered AVC audit message
 */

use crate::avc::classes::{class_name, perm_names};
use crate::avc::types::AccessVectorDecision;
use crate::core::types::{AccessVector, Pid, SecurityClass, Sid};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::SystemTime;

/// Type-specific auxiliary audit data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AuditKind {
    #[default]
    None,
    Fs {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dev: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ino: Option<u64>,
    },
    Net {
        #[serde(skip_serializing_if = "Option::is_none")]
        netif: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        local: Option<SocketAddr>,
        #[serde(skip_serializing_if = "Option::is_none")]
        remote: Option<SocketAddr>,
    },
    Cap {
        capability: u32,
    },
    Ipc {
        key: i32,
    },
}

/// Caller-supplied context for an audited permission check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvcAuditData {
    /// Requesting process; the current process when absent
    pub pid: Option<Pid>,
    pub exe: Option<PathBuf>,
    pub kind: AuditKind,
}

impl AvcAuditData {
    pub fn new(kind: AuditKind) -> Self {
        Self {
            pid: None,
            exe: None,
            kind,
        }
    }

    pub fn fs(path: impl Into<PathBuf>) -> Self {
        Self::new(AuditKind::Fs {
            path: Some(path.into()),
            dev: None,
            ino: None,
        })
    }

    pub fn inode(dev: impl Into<String>, ino: u64) -> Self {
        Self::new(AuditKind::Fs {
            path: None,
            dev: Some(dev.into()),
            ino: Some(ino),
        })
    }

    pub fn net(netif: Option<String>, local: Option<SocketAddr>, remote: Option<SocketAddr>) -> Self {
        Self::new(AuditKind::Net {
            netif,
            local,
            remote,
        })
    }

    pub fn cap(capability: u32) -> Self {
        Self::new(AuditKind::Cap { capability })
    }

    pub fn ipc(key: i32) -> Self {
        Self::new(AuditKind::Ipc { key })
    }

    pub fn with_pid(mut self, pid: Pid) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.exe = Some(exe.into());
        self
    }
}

/// Permissions selected for auditing and the outcome to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSelection {
    pub audited: AccessVector,
    pub denied: bool,
}

/// Decide whether a check must be audited and which bits to report
///
/// `failed` is the check result; it only matters when no requested bit was
/// denied by the decision itself.
pub fn select_audited(
    requested: AccessVector,
    avd: &AccessVectorDecision,
    failed: bool,
) -> Option<AuditSelection> {
    let denied = avd.denied(requested);
    if denied != 0 {
        (denied & avd.auditdeny != 0).then_some(AuditSelection {
            audited: denied,
            denied: true,
        })
    } else if failed {
        Some(AuditSelection {
            audited: requested,
            denied: true,
        })
    } else {
        (requested & avd.auditallow != 0).then_some(AuditSelection {
            audited: requested,
            denied: false,
        })
    }
}

/// Rendered AVC audit record
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AvcAuditRecord {
    pub denied: bool,
    pub permissions: Vec<String>,
    pub pid: Pid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<PathBuf>,
    pub aux: AuditKind,
    pub ssid: Sid,
    pub tsid: Sid,
    /// `None` when the SID could not be resolved; rendered as `ssid=N`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scontext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcontext: Option<String>,
    pub tclass: String,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub logged_at: SystemTime,
}

impl AvcAuditRecord {
    /// Assemble a record; contexts are already resolved by the caller
    pub fn new(
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        selection: AuditSelection,
        data: Option<&AvcAuditData>,
        scontext: Option<String>,
        tcontext: Option<String>,
    ) -> Self {
        let (pid, exe, aux) = match data {
            Some(data) => (
                data.pid.unwrap_or_else(std::process::id),
                data.exe.clone().or_else(current_exe),
                data.kind.clone(),
            ),
            None => (std::process::id(), current_exe(), AuditKind::None),
        };

        Self {
            denied: selection.denied,
            permissions: perm_names(tclass, selection.audited),
            pid,
            exe,
            aux,
            ssid,
            tsid,
            scontext,
            tcontext,
            tclass: class_name(tclass)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}", tclass)),
            logged_at: SystemTime::now(),
        }
    }

    pub fn outcome(&self) -> &'static str {
        if self.denied {
            "denied"
        } else {
            "granted"
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Best effort; the executable may be unlinked or inaccessible
fn current_exe() -> Option<PathBuf> {
    std::env::current_exe().ok()
}

impl fmt::Display for AvcAuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "avc:  {}  {{", self.outcome())?;
        for perm in &self.permissions {
            write!(f, " {}", perm)?;
        }
        write!(f, " }} for  pid={}", self.pid)?;
        if let Some(exe) = &self.exe {
            write!(f, " exe={}", exe.display())?;
        }

        match &self.aux {
            AuditKind::None => {}
            AuditKind::Fs { path, dev, ino } => {
                if let Some(path) = path {
                    write!(f, " path={}", path.display())?;
                }
                if let Some(dev) = dev {
                    write!(f, " dev={}", dev)?;
                }
                if let Some(ino) = ino {
                    write!(f, " ino={}", ino)?;
                }
            }
            AuditKind::Net {
                netif,
                local,
                remote,
            } => {
                if let Some(local) = local {
                    write!(f, " laddr={} lport={}", local.ip(), local.port())?;
                }
                if let Some(remote) = remote {
                    write!(f, " faddr={} fport={}", remote.ip(), remote.port())?;
                }
                if let Some(netif) = netif {
                    write!(f, " netif={}", netif)?;
                }
            }
            AuditKind::Cap { capability } => write!(f, " capability={}", capability)?,
            AuditKind::Ipc { key } => write!(f, " key={}", key)?,
        }

        match &self.scontext {
            Some(scontext) => write!(f, " scontext={}", scontext)?,
            None => write!(f, " ssid={}", self.ssid)?,
        }
        match &self.tcontext {
            Some(tcontext) => write!(f, " tcontext={}", tcontext)?,
            None => write!(f, " tsid={}", self.tsid)?,
        }
        write!(f, " tclass={}", self.tclass)
    }
}
