//! Storage devices and their path prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::IconKind;
use crate::services::DeviceSwitch;

/// Logical storage device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceId {
    Sd,
    Usb,
    Dvd,
    Smb,
    SdSlotA,
    SdSlotB,
    SdPort2,
    SdGcLoader,
}

/// One row of the fixed device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRoot {
    pub id: DeviceId,
    /// Root path, e.g. `sd:/`.
    pub prefix: &'static str,
    /// Label shown in the device selection listing.
    pub label: &'static str,
    pub icon: IconKind,
}

/// All known device roots, in prefix-resolution priority order.
pub static DEVICE_ROOTS: [DeviceRoot; 8] = [
    DeviceRoot {
        id: DeviceId::Sd,
        prefix: "sd:/",
        label: "SD Card",
        icon: IconKind::Sd,
    },
    DeviceRoot {
        id: DeviceId::Usb,
        prefix: "usb:/",
        label: "USB Mass Storage",
        icon: IconKind::Usb,
    },
    DeviceRoot {
        id: DeviceId::Dvd,
        prefix: "dvd:/",
        label: "Data DVD",
        icon: IconKind::Dvd,
    },
    DeviceRoot {
        id: DeviceId::Smb,
        prefix: "smb:/",
        label: "Network Share",
        icon: IconKind::Smb,
    },
    DeviceRoot {
        id: DeviceId::SdSlotA,
        prefix: "carda:/",
        label: "SD Gecko Slot A",
        icon: IconKind::Sd,
    },
    DeviceRoot {
        id: DeviceId::SdSlotB,
        prefix: "cardb:/",
        label: "SD Gecko Slot B",
        icon: IconKind::Sd,
    },
    DeviceRoot {
        id: DeviceId::SdPort2,
        prefix: "port2:/",
        label: "SD in SP2",
        icon: IconKind::Sd,
    },
    DeviceRoot {
        id: DeviceId::SdGcLoader,
        prefix: "gcloader:/",
        label: "GC Loader",
        icon: IconKind::Sd,
    },
];

impl DeviceId {
    /// Table row for this device.
    pub fn root(self) -> &'static DeviceRoot {
        let index = match self {
            DeviceId::Sd => 0,
            DeviceId::Usb => 1,
            DeviceId::Dvd => 2,
            DeviceId::Smb => 3,
            DeviceId::SdSlotA => 4,
            DeviceId::SdSlotB => 5,
            DeviceId::SdPort2 => 6,
            DeviceId::SdGcLoader => 7,
        };
        &DEVICE_ROOTS[index]
    }

    pub fn prefix(self) -> &'static str {
        self.root().prefix
    }

    /// Device name without the `:/` suffix (`sd`, `usb`, ...).
    pub fn name(self) -> &'static str {
        self.prefix().trim_end_matches(":/")
    }

    /// Parse a device name as written on the command line (`sd`, `sd:`, `sd:/`).
    pub fn from_name(name: &str) -> Option<DeviceId> {
        let name = name.trim_end_matches('/').trim_end_matches(':');
        DEVICE_ROOTS
            .iter()
            .find(|root| root.id.name().eq_ignore_ascii_case(name))
            .map(|root| root.id)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a path to the device whose prefix it starts with.
pub fn resolve(path: &str) -> Option<DeviceId> {
    if path.is_empty() {
        return None;
    }
    DEVICE_ROOTS
        .iter()
        .find(|root| path.starts_with(root.prefix))
        .map(|root| root.id)
}

/// What a detected device will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Load,
    Save,
}

impl DeviceKind {
    /// Devices probed by auto-detection, in priority order.
    pub fn candidates(self) -> &'static [DeviceId] {
        const LOAD: [DeviceId; 8] = [
            DeviceId::Sd,
            DeviceId::Usb,
            DeviceId::SdSlotA,
            DeviceId::SdSlotB,
            DeviceId::SdPort2,
            DeviceId::SdGcLoader,
            DeviceId::Dvd,
            DeviceId::Smb,
        ];
        // Optical media is read-only.
        const SAVE: [DeviceId; 7] = [
            DeviceId::Sd,
            DeviceId::Usb,
            DeviceId::SdSlotA,
            DeviceId::SdSlotB,
            DeviceId::SdPort2,
            DeviceId::SdGcLoader,
            DeviceId::Smb,
        ];
        match self {
            DeviceKind::Load => &LOAD,
            DeviceKind::Save => &SAVE,
        }
    }
}

/// Probe candidate devices in priority order; first one that activates wins.
pub fn detect<S: DeviceSwitch + ?Sized>(switch: &mut S, kind: DeviceKind) -> Option<DeviceId> {
    kind.candidates()
        .iter()
        .copied()
        .find(|&device| switch.activate(device, true))
}

/// Which family of hardware the browser runs on.
///
/// Decides the device roots offered in the synthetic device listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Front SD slot and USB ports.
    #[default]
    SdUsb,
    /// Memory-card slot adapters.
    CardSlots,
}

impl Platform {
    /// Device roots shown when no directory listing is available.
    pub fn device_roots(self) -> Vec<&'static DeviceRoot> {
        let local: &[DeviceId] = match self {
            Platform::SdUsb => &[DeviceId::Sd, DeviceId::Usb],
            Platform::CardSlots => &[
                DeviceId::SdSlotA,
                DeviceId::SdSlotB,
                DeviceId::SdPort2,
                DeviceId::SdGcLoader,
            ],
        };
        local
            .iter()
            .chain([DeviceId::Smb, DeviceId::Dvd].iter())
            .map(|id| id.root())
            .collect()
    }
}
