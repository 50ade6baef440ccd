use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};

use crate::kernels::blur::{BlurKernel, BLUR_OP};
use crate::op::{DeviceType, Kernel, KernelConfig, OpDefinition};

type KernelFactory = dyn Fn(&KernelConfig) -> Result<Box<dyn Kernel>> + Send + Sync;

struct KernelRegistration {
    device: DeviceType,
    num_devices: usize,
    factory: Box<KernelFactory>,
}

pub struct KernelRegistry {
    ops: HashMap<String, OpDefinition>,
    kernels: HashMap<String, Vec<KernelRegistration>>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
            kernels: HashMap::new(),
        }
    }

    pub fn register_op(&mut self, definition: OpDefinition) {
        self.ops.insert(definition.name.clone(), definition);
    }

    /// Bind a kernel factory to an already registered op.
    pub fn register_kernel<F>(
        &mut self,
        op_name: &str,
        device: DeviceType,
        num_devices: usize,
        factory: F,
    ) -> Result<()>
    where
        F: Fn(&KernelConfig) -> Result<Box<dyn Kernel>> + Send + Sync + 'static,
    {
        if !self.ops.contains_key(op_name) {
            bail!("cannot register kernel for unknown op: {op_name}");
        }

        let registrations = self.kernels.entry(op_name.to_string()).or_default();
        registrations.retain(|existing| existing.device != device);
        registrations.push(KernelRegistration {
            device,
            num_devices,
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn op_definition(&self, op_name: &str) -> Option<&OpDefinition> {
        self.ops.get(op_name)
    }

    pub fn num_devices(&self, op_name: &str, device: DeviceType) -> Option<usize> {
        self.kernels
            .get(op_name)?
            .iter()
            .find(|registration| registration.device == device)
            .map(|registration| registration.num_devices)
    }

    pub fn create(
        &self,
        op_name: &str,
        device: DeviceType,
        config: &KernelConfig,
    ) -> Result<Box<dyn Kernel>> {
        if !self.ops.contains_key(op_name) {
            bail!("unknown op: {op_name}");
        }

        let registration = self
            .kernels
            .get(op_name)
            .and_then(|registrations| registrations.iter().find(|r| r.device == device))
            .ok_or_else(|| anyhow!("no {device:?} kernel registered for op {op_name}"))?;

        (registration.factory)(config)
    }

    pub fn list_ops(&self) -> Vec<&str> {
        let mut ops: Vec<&str> = self.ops.keys().map(|v| v.as_str()).collect();
        ops.sort_unstable();
        ops
    }
}

impl Default for KernelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn register_blur_kernel(registry: &mut KernelRegistry) -> Result<()> {
    registry.register_op(BlurKernel::op_definition());
    registry.register_kernel(BLUR_OP, DeviceType::Cpu, 1, |config| {
        Ok(Box::new(BlurKernel::new(config)))
    })
}

/// Register every op and kernel shipped with `frameblur-core`.
pub fn register_all_kernels(registry: &mut KernelRegistry) -> Result<()> {
    register_blur_kernel(registry)
}

pub fn build_default_registry() -> Result<KernelRegistry> {
    let mut registry = KernelRegistry::new();
    register_all_kernels(&mut registry)?;
    Ok(registry)
}
