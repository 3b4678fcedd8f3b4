// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! iPXE boot decisions.
//!
//! The iPXE script server looks hardware up by MAC and asks one question:
//! what should this interface boot? The answer is gated on the
//! per-interface `allowPXE` flag the engine toggles.

use tink_core::Hardware;

/// Default installation-environment kernel and initrd names, relative to
/// the OSIE base URL.
const DEFAULT_KERNEL: &str = "vmlinuz-x86_64";
const DEFAULT_INITRD: &str = "initramfs-x86_64";

/// What the boot server should answer for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpxeDecision {
    /// `allowPXE` is unset or false: do not netboot this interface.
    Deny,
    /// Serve the operator's inline script verbatim.
    Script(String),
    /// Chain to the operator's script URL.
    Chain(String),
    /// Generate the stock installation-environment script.
    Auto {
        kernel_url: String,
        initrd_url: String,
    },
}

/// Decide what the interface carrying `mac` should boot.
pub fn boot_decision(hardware: &Hardware, mac: &str) -> IpxeDecision {
    let Some(interface) = hardware.interface_by_mac(mac) else {
        return IpxeDecision::Deny;
    };
    let Some(netboot) = interface.netboot.as_ref() else {
        return IpxeDecision::Deny;
    };
    if netboot.allow_pxe != Some(true) {
        return IpxeDecision::Deny;
    }

    if let Some(ipxe) = netboot.ipxe.as_ref() {
        if let Some(contents) = ipxe.contents.as_ref() {
            return IpxeDecision::Script(contents.clone());
        }
        if let Some(url) = ipxe.url.as_ref() {
            return IpxeDecision::Chain(url.clone());
        }
    }

    let base = netboot
        .osie
        .as_ref()
        .and_then(|osie| osie.base_url.as_deref())
        .unwrap_or("")
        .trim_end_matches('/');
    let kernel = netboot
        .osie
        .as_ref()
        .and_then(|osie| osie.kernel.as_deref())
        .unwrap_or(DEFAULT_KERNEL);
    let initrd = netboot
        .osie
        .as_ref()
        .and_then(|osie| osie.initrd.as_deref())
        .unwrap_or(DEFAULT_INITRD);

    IpxeDecision::Auto {
        kernel_url: format!("{base}/{kernel}"),
        initrd_url: format!("{base}/{initrd}"),
    }
}

/// The iPXE binary to hand out over TFTP, honoring the per-interface
/// override and falling back by firmware type.
pub fn ipxe_binary<'a>(hardware: &'a Hardware, mac: &str) -> &'a str {
    let interface = hardware.interface_by_mac(mac);
    if let Some(binary) = interface
        .and_then(|i| i.netboot.as_ref())
        .and_then(|n| n.ipxe_binary.as_deref())
    {
        return binary;
    }
    let uefi = interface
        .and_then(|i| i.dhcp.as_ref())
        .is_some_and(|d| d.uefi);
    if uefi {
        "ipxe.efi"
    } else {
        "undionly.kpxe"
    }
}

/// Render the stock auto-boot script.
pub fn auto_script(kernel_url: &str, initrd_url: &str, cmdline: &str) -> String {
    let mut script = String::from("#!ipxe\n\n");
    script.push_str("dhcp\n");
    script.push_str(&format!("kernel {kernel_url} {cmdline}\n"));
    script.push_str(&format!("initrd {initrd_url}\n"));
    script.push_str("boot\n");
    script
}

#[cfg(test)]
#[path = "ipxe_tests.rs"]
mod tests;
