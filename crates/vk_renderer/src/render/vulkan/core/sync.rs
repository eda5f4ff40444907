//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! One [`FrameSync`] per in-flight frame slot:
//! ```text
//! acquire ──image_available──▶ submit ──render_finished──▶ present
//!                               └──in_flight fence──▶ CPU waits before reusing the slot
//! ```
//! Slots are created once and survive every swapchain rebuild. A slot's
//! fence is only reset right before new work is submitted with it, so a
//! frame abandoned after acquire leaves the fence signaled and the next wait
//! on it cannot deadlock.

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};

/// Binary semaphore with RAII cleanup
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device.create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence, optionally already signaled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device.create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Block until the fence is signaled
    pub fn wait(&self) -> VulkanResult<()> {
        unsafe {
            self.device.wait_for_fences(&[self.fence], true, u64::MAX)
                .map_err(VulkanError::Api)
        }
    }

    /// Return the fence to the unsignaled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device.reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects for one in-flight frame slot
pub struct FrameSync {
    /// Signaled when the acquired swapchain image is ready to be rendered to
    pub image_available: Semaphore,
    /// Signaled when the slot's rendering is done and the image can be presented
    pub render_finished: Semaphore,
    /// Signaled when the GPU has finished the slot's submission
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create frame synchronization objects; the fence starts signaled
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }
}

/// Which slot's submission last rendered to each swapchain image
///
/// Uniform buffers and command buffers are per image, so before one is
/// reused the scheduler must know whose fence guards it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagesInFlight {
    owners: Vec<Option<usize>>,
}

impl ImagesInFlight {
    /// No image has an owner
    pub fn new(image_count: usize) -> Self {
        Self {
            owners: vec![None; image_count],
        }
    }

    /// Forget every owner; called when a new swapchain generation is built
    pub fn reset(&mut self, image_count: usize) {
        self.owners.clear();
        self.owners.resize(image_count, None);
    }

    /// Record `slot` as the new owner of `image`
    ///
    /// Returns the previous owner if it was a different slot; that slot's
    /// fence must be waited on before the image's resources are touched.
    pub fn claim(&mut self, image: usize, slot: usize) -> VulkanResult<Option<usize>> {
        let owner = self.owners.get_mut(image).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Swapchain image {image} is not tracked"),
        })?;
        let previous = owner.replace(slot);
        Ok(previous.filter(|&previous| previous != slot))
    }

    /// Current owner of `image`
    pub fn owner(&self, image: usize) -> Option<usize> {
        self.owners.get(image).copied().flatten()
    }
}

/// The ring of in-flight frame slots plus image ownership tracking
pub struct FrameSynchronizer {
    slots: Vec<FrameSync>,
    images_in_flight: ImagesInFlight,
}

impl FrameSynchronizer {
    /// Create `frames_in_flight` slots
    pub fn new(device: &Device, frames_in_flight: usize) -> VulkanResult<Self> {
        if frames_in_flight == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "At least one frame in flight is required".to_string(),
            });
        }

        let slots = (0..frames_in_flight)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::debug!("Created {} frame sync slots", frames_in_flight);

        Ok(Self {
            slots,
            images_in_flight: ImagesInFlight::default(),
        })
    }

    /// Number of slots
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Sync objects of `slot`
    pub fn slot(&self, slot: usize) -> VulkanResult<&FrameSync> {
        self.slots.get(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Frame slot {slot} out of range ({} slots)", self.slots.len()),
        })
    }

    /// Block until the slot's previous submission has completed
    pub fn wait(&self, slot: usize) -> VulkanResult<()> {
        self.slot(slot)?.in_flight.wait()
    }

    /// Wait then reset; called immediately before submitting with the slot
    pub fn wait_and_reset(&self, slot: usize) -> VulkanResult<()> {
        let sync = self.slot(slot)?;
        sync.in_flight.wait()?;
        sync.in_flight.reset()
    }

    /// Make `slot` the owner of `image`, first waiting for any other slot still using it
    pub fn claim_image(&mut self, slot: usize, image: u32) -> VulkanResult<()> {
        if let Some(previous) = self.images_in_flight.claim(image as usize, slot)? {
            log::trace!("Image {} still owned by slot {}, waiting", image, previous);
            self.wait(previous)?;
        }
        Ok(())
    }

    /// Drop all image ownership; the new generation may have a different image count
    pub fn reset_image_tracking(&mut self, image_count: usize) {
        self.images_in_flight.reset(image_count);
    }
}
