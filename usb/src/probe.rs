use crate::device::base::UsbHandle;
use crate::error::TransportError;
use crate::kernel::RECENT_KERNEL;
use crate::protocol::{version_query, VersionQuery};
use crate::transfer::{transfer, TransferBuffer};
use enum_map::{enum_map, EnumMap};
use labjack_types::{FirmwareVersions, ProductId, TransferKind, VersionPair};
use lazy_static::lazy_static;
use log::{debug, error};
use std::time::Duration;

/// Why a freshly opened device was accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The host kernel handles every firmware revision, nothing was sent.
    KernelRecent,
    /// The family has no version gate.
    NotRequired,
    Passed(FirmwareVersions),
}

/// Minimum versions a family needs on kernels older than 2.6.28.
#[derive(Copy, Clone, Debug)]
pub struct VersionRule {
    minimum_firmware: VersionPair,
    required_hardware: Option<VersionPair>,
}

impl VersionRule {
    pub fn check(&self, product: ProductId, versions: &FirmwareVersions) -> Result<(), String> {
        if let Some(required) = self.required_hardware {
            if versions.hardware != Some(required) {
                let found = versions
                    .hardware
                    .map_or_else(|| "unknown".to_string(), |hw| hw.to_string());
                return Err(format!(
                    "{} hardware {} is only supported from kernel {:?}, this kernel requires hardware {}",
                    product, found, RECENT_KERNEL, required
                ));
            }
        }

        if versions.firmware < self.minimum_firmware {
            return Err(format!(
                "{} firmware {} is below the {} required on this kernel, update the firmware or upgrade to kernel {:?}",
                product, versions.firmware, self.minimum_firmware, RECENT_KERNEL
            ));
        }
        Ok(())
    }
}

lazy_static! {
    static ref VERSION_RULES: EnumMap<ProductId, Option<VersionRule>> = enum_map! {
        ProductId::U3 => Some(VersionRule {
            minimum_firmware: VersionPair(1, 18),
            required_hardware: Some(VersionPair(1, 30)),
        }),
        ProductId::U6 => Some(VersionRule {
            minimum_firmware: VersionPair(0, 81),
            required_hardware: None,
        }),
        ProductId::Ue9 => Some(VersionRule {
            minimum_firmware: VersionPair(1, 49),
            required_hardware: None,
        }),
        ProductId::U12 => None,
        ProductId::Bridge => None,
    };
}

pub fn version_rule(product: ProductId) -> Option<VersionRule> {
    VERSION_RULES[product]
}

/// Decides whether a newly opened device may be handed to the caller. Runs
/// once per open and never retries; any failure means the handle must be
/// closed.
pub(crate) fn check_compatibility<H: UsbHandle>(
    handle: &H,
    product_id: u16,
    kernel_recent: bool,
    timeout: Duration,
) -> Result<ProbeOutcome, TransportError> {
    let incompatible = |reason: String| {
        error!("{}", reason);
        TransportError::IncompatibleFirmware { product_id, reason }
    };

    if kernel_recent {
        debug!("Recent kernel, skipping the firmware check");
        return Ok(ProbeOutcome::KernelRecent);
    }

    let product = ProductId::from_id(product_id).ok_or_else(|| {
        incompatible(format!(
            "Firmware check not supported for product {:#06x}",
            product_id
        ))
    })?;

    let (query, rule) = match (version_query(product), version_rule(product)) {
        (Some(query), Some(rule)) => (query, rule),
        _ => {
            debug!("{} has no firmware requirement", product);
            return Ok(ProbeOutcome::NotRequired);
        }
    };

    let versions = read_versions(handle, product, query, timeout);
    let versions = versions.map_err(incompatible)?;
    debug!("{} reports {:?}", product, versions);

    rule.check(product, &versions).map_err(incompatible)?;
    Ok(ProbeOutcome::Passed(versions))
}

fn read_versions<H: UsbHandle>(
    handle: &H,
    product: ProductId,
    query: &VersionQuery,
    timeout: Duration,
) -> Result<FirmwareVersions, String> {
    let command = query.command();
    let written = transfer(
        handle,
        product.id(),
        TransferKind::Write,
        TransferBuffer::Outbound(&command),
        timeout,
    )
    .map_err(|e| format!("{} request failed: {}", query.name(), e))?;

    if written < command.len() {
        return Err(format!(
            "{} request truncated, wrote {} of {} bytes",
            query.name(),
            written,
            command.len()
        ));
    }

    let mut response = vec![0; query.response_length()];
    let received = transfer(
        handle,
        product.id(),
        TransferKind::Read,
        TransferBuffer::Inbound(&mut response),
        timeout,
    )
    .map_err(|e| format!("{} response failed: {}", query.name(), e))?;

    response.truncate(received);
    query
        .parse(&response)
        .map_err(|e| format!("{} (response was {:?})", e, response))
}
