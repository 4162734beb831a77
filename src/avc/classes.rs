/*!
 * Security Classes
 * Class numbers and per-class permission name tables used to render audit records
 */

use crate::core::types::{AccessVector, SecurityClass};

pub const SECCLASS_SECURITY: SecurityClass = 1;
pub const SECCLASS_PROCESS: SecurityClass = 2;
pub const SECCLASS_SYSTEM: SecurityClass = 3;
pub const SECCLASS_CAPABILITY: SecurityClass = 4;
pub const SECCLASS_FILESYSTEM: SecurityClass = 5;
pub const SECCLASS_FILE: SecurityClass = 6;
pub const SECCLASS_DIR: SecurityClass = 7;
pub const SECCLASS_FD: SecurityClass = 8;
pub const SECCLASS_LNK_FILE: SecurityClass = 9;
pub const SECCLASS_CHR_FILE: SecurityClass = 10;
pub const SECCLASS_BLK_FILE: SecurityClass = 11;
pub const SECCLASS_SOCK_FILE: SecurityClass = 12;
pub const SECCLASS_FIFO_FILE: SecurityClass = 13;
pub const SECCLASS_SOCKET: SecurityClass = 14;
pub const SECCLASS_TCP_SOCKET: SecurityClass = 15;
pub const SECCLASS_UDP_SOCKET: SecurityClass = 16;
pub const SECCLASS_RAWIP_SOCKET: SecurityClass = 17;
pub const SECCLASS_NODE: SecurityClass = 18;
pub const SECCLASS_NETIF: SecurityClass = 19;
pub const SECCLASS_NETLINK_SOCKET: SecurityClass = 20;
pub const SECCLASS_PACKET_SOCKET: SecurityClass = 21;
pub const SECCLASS_KEY_SOCKET: SecurityClass = 22;
pub const SECCLASS_UNIX_STREAM_SOCKET: SecurityClass = 23;
pub const SECCLASS_UNIX_DGRAM_SOCKET: SecurityClass = 24;
pub const SECCLASS_SEM: SecurityClass = 25;
pub const SECCLASS_MSG: SecurityClass = 26;
pub const SECCLASS_MSGQ: SecurityClass = 27;
pub const SECCLASS_SHM: SecurityClass = 28;
pub const SECCLASS_IPC: SecurityClass = 29;

/// Permission bits shared by every file-like class
pub mod file {
    use crate::core::types::AccessVector;

    pub const IOCTL: AccessVector = 0x0000_0001;
    pub const READ: AccessVector = 0x0000_0002;
    pub const WRITE: AccessVector = 0x0000_0004;
    pub const CREATE: AccessVector = 0x0000_0008;
    pub const GETATTR: AccessVector = 0x0000_0010;
    pub const SETATTR: AccessVector = 0x0000_0020;
    pub const LOCK: AccessVector = 0x0000_0040;
    pub const RELABELFROM: AccessVector = 0x0000_0080;
    pub const RELABELTO: AccessVector = 0x0000_0100;
    pub const APPEND: AccessVector = 0x0000_0200;
    pub const UNLINK: AccessVector = 0x0000_0400;
    pub const LINK: AccessVector = 0x0000_0800;
    pub const RENAME: AccessVector = 0x0000_1000;
    pub const EXECUTE: AccessVector = 0x0000_2000;
    pub const SWAPON: AccessVector = 0x0000_4000;
    pub const QUOTAON: AccessVector = 0x0000_8000;
    pub const MOUNTON: AccessVector = 0x0001_0000;
    pub const EXECUTE_NO_TRANS: AccessVector = 0x0002_0000;
    pub const ENTRYPOINT: AccessVector = 0x0004_0000;
}

pub mod dir {
    use crate::core::types::AccessVector;

    pub const ADD_NAME: AccessVector = 0x0002_0000;
    pub const REMOVE_NAME: AccessVector = 0x0004_0000;
    pub const REPARENT: AccessVector = 0x0008_0000;
    pub const SEARCH: AccessVector = 0x0010_0000;
    pub const RMDIR: AccessVector = 0x0020_0000;
}

/// Permission bits shared by every socket class
pub mod socket {
    use crate::core::types::AccessVector;

    pub const BIND: AccessVector = 0x0000_0400;
    pub const CONNECT: AccessVector = 0x0000_0800;
    pub const LISTEN: AccessVector = 0x0000_1000;
    pub const ACCEPT: AccessVector = 0x0000_2000;
    pub const GETOPT: AccessVector = 0x0000_4000;
    pub const SETOPT: AccessVector = 0x0000_8000;
    pub const SHUTDOWN: AccessVector = 0x0001_0000;
    pub const RECVFROM: AccessVector = 0x0002_0000;
    pub const SENDTO: AccessVector = 0x0004_0000;
    pub const RECV_MSG: AccessVector = 0x0008_0000;
    pub const SEND_MSG: AccessVector = 0x0010_0000;
    pub const NAME_BIND: AccessVector = 0x0020_0000;
    pub const CONNECTTO: AccessVector = 0x0040_0000;
    pub const NEWCONN: AccessVector = 0x0080_0000;
    pub const ACCEPTFROM: AccessVector = 0x0100_0000;
}

pub mod process {
    use crate::core::types::AccessVector;

    pub const FORK: AccessVector = 0x0000_0001;
    pub const TRANSITION: AccessVector = 0x0000_0002;
    pub const SIGCHLD: AccessVector = 0x0000_0004;
    pub const SIGKILL: AccessVector = 0x0000_0008;
    pub const SIGSTOP: AccessVector = 0x0000_0010;
    pub const SIGNULL: AccessVector = 0x0000_0020;
    pub const SIGNAL: AccessVector = 0x0000_0040;
    pub const PTRACE: AccessVector = 0x0000_0080;
    pub const GETSCHED: AccessVector = 0x0000_0100;
    pub const SETSCHED: AccessVector = 0x0000_0200;
    pub const GETSESSION: AccessVector = 0x0000_0400;
    pub const GETPGID: AccessVector = 0x0000_0800;
    pub const SETPGID: AccessVector = 0x0000_1000;
    pub const GETCAP: AccessVector = 0x0000_2000;
    pub const SETCAP: AccessVector = 0x0000_4000;
    pub const SHARE: AccessVector = 0x0000_8000;
    pub const GETATTR: AccessVector = 0x0001_0000;
    pub const SETEXEC: AccessVector = 0x0002_0000;
    pub const SETFSCREATE: AccessVector = 0x0004_0000;
    pub const NOATSECURE: AccessVector = 0x0008_0000;
    pub const SIGINH: AccessVector = 0x0010_0000;
    pub const SETRLIMIT: AccessVector = 0x0020_0000;
    pub const RLIMITINH: AccessVector = 0x0040_0000;
}

/// Permission bits shared by every System V IPC class
pub mod ipc {
    use crate::core::types::AccessVector;

    pub const CREATE: AccessVector = 0x0000_0001;
    pub const DESTROY: AccessVector = 0x0000_0002;
    pub const GETATTR: AccessVector = 0x0000_0004;
    pub const SETATTR: AccessVector = 0x0000_0008;
    pub const READ: AccessVector = 0x0000_0010;
    pub const WRITE: AccessVector = 0x0000_0020;
    pub const ASSOCIATE: AccessVector = 0x0000_0040;
    pub const UNIX_READ: AccessVector = 0x0000_0080;
    pub const UNIX_WRITE: AccessVector = 0x0000_0100;
    pub const ENQUEUE: AccessVector = 0x0000_0200;
    pub const SHM_LOCK: AccessVector = 0x0000_0200;
}

const COMMON_FILE: &[&str] = &[
    "ioctl",
    "read",
    "write",
    "create",
    "getattr",
    "setattr",
    "lock",
    "relabelfrom",
    "relabelto",
    "append",
    "unlink",
    "link",
    "rename",
    "execute",
    "swapon",
    "quotaon",
    "mounton",
];

const COMMON_SOCKET: &[&str] = &[
    "ioctl",
    "read",
    "write",
    "create",
    "getattr",
    "setattr",
    "lock",
    "relabelfrom",
    "relabelto",
    "append",
    "bind",
    "connect",
    "listen",
    "accept",
    "getopt",
    "setopt",
    "shutdown",
    "recvfrom",
    "sendto",
    "recv_msg",
    "send_msg",
    "name_bind",
];

const COMMON_IPC: &[&str] = &[
    "create",
    "destroy",
    "getattr",
    "setattr",
    "read",
    "write",
    "associate",
    "unix_read",
    "unix_write",
];

const SECURITY_PERMS: &[&str] = &[
    "compute_av",
    "compute_create",
    "compute_member",
    "check_context",
    "load_policy",
    "compute_relabel",
    "compute_user",
    "setenforce",
];

const PROCESS_PERMS: &[&str] = &[
    "fork",
    "transition",
    "sigchld",
    "sigkill",
    "sigstop",
    "signull",
    "signal",
    "ptrace",
    "getsched",
    "setsched",
    "getsession",
    "getpgid",
    "setpgid",
    "getcap",
    "setcap",
    "share",
    "getattr",
    "setexec",
    "setfscreate",
    "noatsecure",
    "siginh",
    "setrlimit",
    "rlimitinh",
];

const SYSTEM_PERMS: &[&str] = &["ipc_info", "syslog_read", "syslog_mod", "syslog_console"];

const CAPABILITY_PERMS: &[&str] = &[
    "chown",
    "dac_override",
    "dac_read_search",
    "fowner",
    "fsetid",
    "kill",
    "setgid",
    "setuid",
    "setpcap",
    "linux_immutable",
    "net_bind_service",
    "net_broadcast",
    "net_admin",
    "net_raw",
    "ipc_lock",
    "ipc_owner",
    "sys_module",
    "sys_rawio",
    "sys_chroot",
    "sys_ptrace",
    "sys_pacct",
    "sys_admin",
    "sys_boot",
    "sys_nice",
    "sys_resource",
    "sys_time",
    "sys_tty_config",
    "mknod",
    "lease",
];

const FILESYSTEM_PERMS: &[&str] = &[
    "mount",
    "remount",
    "unmount",
    "getattr",
    "relabelfrom",
    "relabelto",
    "transition",
    "associate",
    "quotamod",
    "quotaget",
];

const FD_PERMS: &[&str] = &["use"];
const FILE_PERMS: &[&str] = &["execute_no_trans", "entrypoint"];
const DIR_PERMS: &[&str] = &["add_name", "remove_name", "reparent", "search", "rmdir"];
const TCP_SOCKET_PERMS: &[&str] = &["connectto", "newconn", "acceptfrom"];
const NODE_PERMS: &[&str] = &[
    "tcp_recv", "tcp_send", "udp_recv", "udp_send", "rawip_recv", "rawip_send", "enforce_dest",
];
const NETIF_PERMS: &[&str] = &[
    "tcp_recv", "tcp_send", "udp_recv", "udp_send", "rawip_recv", "rawip_send",
];
const UNIX_STREAM_PERMS: &[&str] = &["connectto", "newconn", "acceptfrom"];
const MSGQ_PERMS: &[&str] = &["enqueue"];
const MSG_PERMS: &[&str] = &["send", "receive"];
const SHM_PERMS: &[&str] = &["lock"];

/// Naming information for one security class
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo {
    pub name: &'static str,
    /// Names for the low bits shared with sibling classes
    common: &'static [&'static str],
    /// Names for the bits following the common ones
    specific: &'static [&'static str],
}

impl ClassInfo {
    const fn new(
        name: &'static str,
        common: &'static [&'static str],
        specific: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            common,
            specific,
        }
    }

    /// Name of a single permission bit
    pub fn perm_name(&self, bit: u32) -> Option<&'static str> {
        let index = bit as usize;
        if index < self.common.len() {
            Some(self.common[index])
        } else {
            self.specific.get(index - self.common.len()).copied()
        }
    }
}

const CLASSES: &[ClassInfo] = &[
    ClassInfo::new("security", &[], SECURITY_PERMS),
    ClassInfo::new("process", &[], PROCESS_PERMS),
    ClassInfo::new("system", &[], SYSTEM_PERMS),
    ClassInfo::new("capability", &[], CAPABILITY_PERMS),
    ClassInfo::new("filesystem", &[], FILESYSTEM_PERMS),
    ClassInfo::new("file", COMMON_FILE, FILE_PERMS),
    ClassInfo::new("dir", COMMON_FILE, DIR_PERMS),
    ClassInfo::new("fd", &[], FD_PERMS),
    ClassInfo::new("lnk_file", COMMON_FILE, &[]),
    ClassInfo::new("chr_file", COMMON_FILE, &[]),
    ClassInfo::new("blk_file", COMMON_FILE, &[]),
    ClassInfo::new("sock_file", COMMON_FILE, &[]),
    ClassInfo::new("fifo_file", COMMON_FILE, &[]),
    ClassInfo::new("socket", COMMON_SOCKET, &[]),
    ClassInfo::new("tcp_socket", COMMON_SOCKET, TCP_SOCKET_PERMS),
    ClassInfo::new("udp_socket", COMMON_SOCKET, &[]),
    ClassInfo::new("rawip_socket", COMMON_SOCKET, &[]),
    ClassInfo::new("node", &[], NODE_PERMS),
    ClassInfo::new("netif", &[], NETIF_PERMS),
    ClassInfo::new("netlink_socket", COMMON_SOCKET, &[]),
    ClassInfo::new("packet_socket", COMMON_SOCKET, &[]),
    ClassInfo::new("key_socket", COMMON_SOCKET, &[]),
    ClassInfo::new("unix_stream_socket", COMMON_SOCKET, UNIX_STREAM_PERMS),
    ClassInfo::new("unix_dgram_socket", COMMON_SOCKET, &[]),
    ClassInfo::new("sem", COMMON_IPC, &[]),
    ClassInfo::new("msg", &[], MSG_PERMS),
    ClassInfo::new("msgq", COMMON_IPC, MSGQ_PERMS),
    ClassInfo::new("shm", COMMON_IPC, SHM_PERMS),
    ClassInfo::new("ipc", COMMON_IPC, &[]),
];

/// Look up naming information for a class
pub fn class_info(tclass: SecurityClass) -> Option<&'static ClassInfo> {
    if tclass == 0 {
        return None;
    }
    CLASSES.get(tclass as usize - 1)
}

/// Class name, if the class is known
pub fn class_name(tclass: SecurityClass) -> Option<&'static str> {
    class_info(tclass).map(|info| info.name)
}

/// Names of every bit set in `av`, lowest bit first
///
/// Bits without a name for this class are rendered as hex.
pub fn perm_names(tclass: SecurityClass, av: AccessVector) -> Vec<String> {
    let info = class_info(tclass);
    (0..AccessVector::BITS)
        .filter(|bit| av & (1 << bit) != 0)
        .map(|bit| {
            info.and_then(|info| info.perm_name(bit))
                .map(str::to_string)
                .unwrap_or_else(|| format!("0x{:x}", 1u32 << bit))
        })
        .collect()
}
