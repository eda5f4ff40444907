//! Frame scheduling
//!
//! [`FrameScheduler`] drives one frame per call through
//! `Acquiring -> Recording -> Presenting -> Advancing`, detouring through
//! `Recreating` when the swapchain goes stale. It owns the frame index and
//! nothing else; the Vulkan work sits behind [`FrameBackend`] and the window
//! behind [`SurfaceSize`], so the state machine runs against mocks in tests.

use crate::render::vulkan::core::context::{VulkanError, VulkanResult};
use crate::render::vulkan::core::swapchain::{AcquireOutcome, PresentOutcome};
use crate::render::vulkan::core::window::ResizeSignal;

/// The GPU-facing half of a frame
pub trait FrameBackend {
    /// Block until the slot's previous submission has completed
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Acquire the next swapchain image, signalling the slot's image-available semaphore
    fn acquire(&mut self, slot: usize) -> VulkanResult<AcquireOutcome>;

    /// Take ownership of the image's per-image resources for `slot`
    fn claim_image(&mut self, slot: usize, image_index: u32) -> VulkanResult<()>;

    /// Rewrite the uniform buffer belonging to `image_index`
    fn update_uniforms(&mut self, image_index: u32) -> VulkanResult<()>;

    /// Reset the slot fence and submit the image's command buffer
    fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()>;

    /// Queue the image for presentation after the slot's render-finished semaphore
    fn present(&mut self, slot: usize, image_index: u32) -> VulkanResult<PresentOutcome>;

    /// Rebuild every extent-dependent resource for a nonzero framebuffer size
    fn recreate(&mut self, framebuffer_size: (u32, u32)) -> VulkanResult<()>;
}

/// The window-facing half of recreation
pub trait SurfaceSize {
    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Block until at least one window event arrives
    fn wait_events(&mut self);
}

/// Where the scheduler is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Between frames
    Idle,
    /// Waiting on the slot fence and acquiring an image
    Acquiring,
    /// Updating uniforms and submitting the command buffer
    Recording,
    /// Handing the image to the presentation engine
    Presenting,
    /// Moving on to the next slot
    Advancing,
    /// Rebuilding the swapchain generation
    Recreating,
}

/// What a call to [`FrameScheduler::draw_frame`] achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// An image was submitted and presented; the frame index moved on
    Presented,
    /// The swapchain was stale on acquire; it was rebuilt and nothing was drawn
    Skipped,
}

/// Frame pacing state machine
#[derive(Debug)]
pub struct FrameScheduler {
    frame_index: usize,
    frames_in_flight: usize,
    state: FrameState,
    resize: ResizeSignal,
    frames_presented: u64,
    recreations: u64,
}

impl FrameScheduler {
    /// Create a scheduler cycling through `frames_in_flight` slots
    pub fn new(frames_in_flight: usize, resize: ResizeSignal) -> VulkanResult<Self> {
        if frames_in_flight == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "At least one frame in flight is required".to_string(),
            });
        }

        Ok(Self {
            frame_index: 0,
            frames_in_flight,
            state: FrameState::Idle,
            resize,
            frames_presented: 0,
            recreations: 0,
        })
    }

    /// Slot the next frame will use
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Number of slots in the ring
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Current state; `Idle` between calls
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frames handed to the presentation engine so far
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Swapchain generations built after the first one
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    /// Run one frame to completion
    ///
    /// Acquire, submit and present failures other than an out-of-date or
    /// suboptimal swapchain are returned and leave the scheduler `Idle`.
    pub fn draw_frame<B, S>(&mut self, backend: &mut B, surface: &mut S) -> VulkanResult<FrameOutcome>
    where
        B: FrameBackend,
        S: SurfaceSize,
    {
        let result = self.step_through_frame(backend, surface);
        self.state = FrameState::Idle;
        result
    }

    fn step_through_frame<B, S>(&mut self, backend: &mut B, surface: &mut S) -> VulkanResult<FrameOutcome>
    where
        B: FrameBackend,
        S: SurfaceSize,
    {
        let slot = self.frame_index;
        let mut image_index = 0;
        let mut acquired_suboptimal = false;
        let mut advance_after_recreate = false;
        let mut outcome = FrameOutcome::Skipped;

        self.state = FrameState::Acquiring;
        loop {
            log::trace!("Frame slot {}: {:?}", slot, self.state);
            match self.state {
                FrameState::Idle => return Ok(outcome),

                FrameState::Acquiring => {
                    backend.wait_for_slot(slot)?;
                    match backend.acquire(slot)? {
                        AcquireOutcome::Acquired { image_index: index, suboptimal } => {
                            image_index = index;
                            acquired_suboptimal = suboptimal;
                            self.state = FrameState::Recording;
                        }
                        AcquireOutcome::OutOfDate => {
                            log::warn!("Swapchain out of date on acquire, rebuilding");
                            self.state = FrameState::Recreating;
                        }
                    }
                }

                FrameState::Recording => {
                    backend.claim_image(slot, image_index)?;
                    backend.update_uniforms(image_index)?;
                    backend.submit(slot, image_index)?;
                    self.state = FrameState::Presenting;
                }

                FrameState::Presenting => {
                    let presented = backend.present(slot, image_index)?;
                    self.frames_presented += 1;
                    outcome = FrameOutcome::Presented;

                    // Taken unconditionally so a resize that coincides with a
                    // suboptimal present only rebuilds once
                    let resized = self.resize.take();
                    let stale = match presented {
                        PresentOutcome::Optimal => acquired_suboptimal,
                        PresentOutcome::Suboptimal | PresentOutcome::OutOfDate => true,
                    };

                    if stale {
                        log::warn!("Swapchain {:?} after present, rebuilding", presented);
                    } else if resized {
                        log::debug!("Framebuffer resized, rebuilding swapchain");
                    }
                    if stale || resized {
                        advance_after_recreate = true;
                        self.state = FrameState::Recreating;
                    } else {
                        self.state = FrameState::Advancing;
                    }
                }

                FrameState::Advancing => {
                    self.frame_index = (self.frame_index + 1) % self.frames_in_flight;
                    self.state = FrameState::Idle;
                }

                FrameState::Recreating => {
                    self.recreate(backend, surface)?;
                    self.state = if advance_after_recreate {
                        FrameState::Advancing
                    } else {
                        FrameState::Idle
                    };
                }
            }
        }
    }

    fn recreate<B, S>(&mut self, backend: &mut B, surface: &mut S) -> VulkanResult<()>
    where
        B: FrameBackend,
        S: SurfaceSize,
    {
        let mut size = surface.framebuffer_size();
        if size.0 == 0 || size.1 == 0 {
            log::info!("Window minimized, waiting for a nonzero framebuffer");
        }
        while size.0 == 0 || size.1 == 0 {
            surface.wait_events();
            size = surface.framebuffer_size();
        }

        // Resizes seen while waiting are covered by this rebuild
        self.resize.take();

        backend.recreate(size)?;
        self.recreations += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Claim(usize, u32),
        Uniforms(u32),
        Submit(usize, u32),
        Present(usize, u32),
        Recreate((u32, u32)),
    }

    struct MockBackend {
        image_count: u32,
        next_image: u32,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<PresentOutcome>,
        acquire_error: Option<ash::vk::Result>,
        fail_submit: bool,
        present_error: Option<ash::vk::Result>,
        // submitted but not yet waited on
        outstanding: Vec<bool>,
        calls: Vec<Call>,
    }

    impl MockBackend {
        fn new(frames_in_flight: usize) -> Self {
            Self {
                image_count: 3,
                next_image: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                acquire_error: None,
                fail_submit: false,
                present_error: None,
                outstanding: vec![false; frames_in_flight],
                calls: Vec::new(),
            }
        }

        fn recreations(&self) -> Vec<(u32, u32)> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Recreate(size) => Some(*size),
                    _ => None,
                })
                .collect()
        }

        fn submissions(&self) -> usize {
            self.calls.iter().filter(|call| matches!(call, Call::Submit(..))).count()
        }
    }

    impl FrameBackend for MockBackend {
        fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
            self.calls.push(Call::Wait(slot));
            self.outstanding[slot] = false;
            Ok(())
        }

        fn acquire(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
            self.calls.push(Call::Acquire(slot));
            if let Some(result) = self.acquire_error {
                return Err(VulkanError::Acquire(result));
            }
            Ok(self.acquire_script.pop_front().unwrap_or_else(|| {
                let image_index = self.next_image % self.image_count;
                self.next_image += 1;
                AcquireOutcome::Acquired {
                    image_index,
                    suboptimal: false,
                }
            }))
        }

        fn claim_image(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
            self.calls.push(Call::Claim(slot, image_index));
            Ok(())
        }

        fn update_uniforms(&mut self, image_index: u32) -> VulkanResult<()> {
            self.calls.push(Call::Uniforms(image_index));
            Ok(())
        }

        fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
            if self.fail_submit {
                return Err(VulkanError::Submit(ash::vk::Result::ERROR_DEVICE_LOST));
            }
            assert!(!self.outstanding[slot], "slot {slot} resubmitted before its fence was waited on");
            self.outstanding[slot] = true;
            self.calls.push(Call::Submit(slot, image_index));
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> VulkanResult<PresentOutcome> {
            self.calls.push(Call::Present(slot, image_index));
            if let Some(result) = self.present_error {
                return Err(VulkanError::Present(result));
            }
            Ok(self.present_script.pop_front().unwrap_or(PresentOutcome::Optimal))
        }

        fn recreate(&mut self, framebuffer_size: (u32, u32)) -> VulkanResult<()> {
            assert!(framebuffer_size.0 > 0 && framebuffer_size.1 > 0);
            self.calls.push(Call::Recreate(framebuffer_size));
            self.next_image = 0;
            Ok(())
        }
    }

    struct MockSurface {
        size: (u32, u32),
        upcoming: VecDeque<(u32, u32)>,
        waits: usize,
        raise_on_wait: Option<ResizeSignal>,
    }

    impl MockSurface {
        fn sized(width: u32, height: u32) -> Self {
            Self {
                size: (width, height),
                upcoming: VecDeque::new(),
                waits: 0,
                raise_on_wait: None,
            }
        }
    }

    impl SurfaceSize for MockSurface {
        fn framebuffer_size(&self) -> (u32, u32) {
            self.size
        }

        fn wait_events(&mut self) {
            self.waits += 1;
            if let Some(size) = self.upcoming.pop_front() {
                self.size = size;
            }
            if let Some(signal) = &self.raise_on_wait {
                signal.raise();
            }
        }
    }

    fn scheduler(frames_in_flight: usize) -> (FrameScheduler, ResizeSignal) {
        let resize = ResizeSignal::new();
        let scheduler = FrameScheduler::new(frames_in_flight, resize.clone()).unwrap();
        (scheduler, resize)
    }

    #[test]
    fn test_zero_frames_in_flight_is_rejected() {
        assert!(FrameScheduler::new(0, ResizeSignal::new()).is_err());
    }

    #[test]
    fn test_frame_steps_in_order() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(800, 600);

        let outcome = scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(
            backend.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::Claim(0, 0),
                Call::Uniforms(0),
                Call::Submit(0, 0),
                Call::Present(0, 0),
            ]
        );
        assert_eq!(scheduler.frame_index(), 1);
        assert_eq!(scheduler.state(), FrameState::Idle);
    }

    #[test]
    fn test_stale_acquire_on_frame_five_resumes_at_same_index() {
        let (mut scheduler, _) = scheduler(8);
        let mut backend = MockBackend::new(8);
        let mut surface = MockSurface::sized(800, 600);

        for _ in 0..5 {
            scheduler.draw_frame(&mut backend, &mut surface).unwrap();
        }
        assert_eq!(scheduler.frame_index(), 5);

        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        let submissions_before = backend.submissions();
        let outcome = scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(scheduler.frame_index(), 5);
        assert_eq!(backend.submissions(), submissions_before);
        assert_eq!(backend.recreations(), vec![(800, 600)]);

        let outcome = scheduler.draw_frame(&mut backend, &mut surface).unwrap();
        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(scheduler.frame_index(), 6);
        assert_eq!(scheduler.recreations(), 1);
        assert_eq!(scheduler.frames_presented(), 6);
    }

    #[test]
    fn test_minimized_window_blocks_until_nonzero() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(0, 0);
        surface.upcoming = VecDeque::from([(0, 0), (640, 0), (1024, 768)]);
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);

        scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert_eq!(surface.waits, 3);
        assert_eq!(backend.recreations(), vec![(1024, 768)]);
        assert_eq!(scheduler.frame_index(), 0);
    }

    #[test]
    fn test_suboptimal_present_and_resize_rebuild_once() {
        let (mut scheduler, resize) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(800, 600);

        resize.raise();
        backend.present_script.push_back(PresentOutcome::Suboptimal);
        let outcome = scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(backend.recreations().len(), 1);
        assert_eq!(scheduler.frame_index(), 1);
        assert!(!resize.is_raised());

        scheduler.draw_frame(&mut backend, &mut surface).unwrap();
        assert_eq!(backend.recreations().len(), 1);
        assert_eq!(scheduler.frame_index(), 0);
    }

    #[test]
    fn test_resize_flag_alone_triggers_rebuild_after_present() {
        let (mut scheduler, resize) = scheduler(3);
        let mut backend = MockBackend::new(3);
        let mut surface = MockSurface::sized(1280, 720);

        resize.raise();
        scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert_eq!(backend.calls.last(), Some(&Call::Recreate((1280, 720))));
        assert!(backend.calls.contains(&Call::Present(0, 0)));
        assert_eq!(scheduler.frame_index(), 1);
    }

    #[test]
    fn test_suboptimal_acquire_still_draws_then_rebuilds() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(800, 600);
        backend.acquire_script.push_back(AcquireOutcome::Acquired {
            image_index: 2,
            suboptimal: true,
        });

        let outcome = scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert_eq!(outcome, FrameOutcome::Presented);
        let present_at = backend.calls.iter().position(|c| *c == Call::Present(0, 2)).unwrap();
        let recreate_at = backend.calls.iter().position(|c| matches!(c, Call::Recreate(_))).unwrap();
        assert!(present_at < recreate_at);
        assert_eq!(scheduler.frame_index(), 1);
    }

    #[test]
    fn test_out_of_date_present_advances_and_rebuilds() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(800, 600);
        backend.present_script.push_back(PresentOutcome::OutOfDate);

        scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert_eq!(scheduler.recreations(), 1);
        assert_eq!(scheduler.frame_index(), 1);
    }

    #[test]
    fn test_resize_during_minimize_wait_is_not_replayed() {
        let (mut scheduler, resize) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(0, 0);
        surface.upcoming = VecDeque::from([(800, 600)]);
        surface.raise_on_wait = Some(resize.clone());
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);

        scheduler.draw_frame(&mut backend, &mut surface).unwrap();
        assert!(!resize.is_raised());

        scheduler.draw_frame(&mut backend, &mut surface).unwrap();
        assert_eq!(backend.recreations().len(), 1);
    }

    #[test]
    fn test_frame_index_stays_in_range() {
        let frames_in_flight = 3;
        let (mut scheduler, resize) = scheduler(frames_in_flight);
        let mut backend = MockBackend::new(frames_in_flight);
        let mut surface = MockSurface::sized(800, 600);

        let mut expected = 0;
        for frame in 0..40 {
            if frame % 7 == 3 {
                backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
            }
            if frame % 11 == 5 {
                resize.raise();
            }

            let outcome = scheduler.draw_frame(&mut backend, &mut surface).unwrap();
            if outcome == FrameOutcome::Presented {
                expected = (expected + 1) % frames_in_flight;
            }
            assert!(scheduler.frame_index() < frames_in_flight);
            assert_eq!(scheduler.frame_index(), expected);
        }
    }

    #[test]
    fn test_every_slot_is_waited_on_before_resubmission() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(800, 600);

        // MockBackend::submit panics if a slot is reused without a wait
        for _ in 0..10 {
            scheduler.draw_frame(&mut backend, &mut surface).unwrap();
        }
        assert_eq!(backend.submissions(), 10);
    }

    #[test]
    fn test_submit_failure_is_fatal_and_leaves_scheduler_idle() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        backend.fail_submit = true;
        let mut surface = MockSurface::sized(800, 600);

        let result = scheduler.draw_frame(&mut backend, &mut surface);

        assert!(matches!(result, Err(VulkanError::Submit(_))));
        assert_eq!(scheduler.state(), FrameState::Idle);
        assert_eq!(scheduler.frame_index(), 0);
    }

    #[test]
    fn test_uniforms_follow_acquired_image_not_slot() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        let mut surface = MockSurface::sized(800, 600);
        backend.acquire_script.push_back(AcquireOutcome::Acquired {
            image_index: 2,
            suboptimal: false,
        });

        scheduler.draw_frame(&mut backend, &mut surface).unwrap();

        assert!(backend.calls.contains(&Call::Uniforms(2)));
        assert!(!backend.calls.contains(&Call::Uniforms(0)));
        assert!(backend.calls.contains(&Call::Submit(0, 2)));
    }

    #[test]
    fn test_acquire_failure_is_fatal() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = MockBackend::new(2);
        backend.acquire_error = Some(ash::vk::Result::ERROR_SURFACE_LOST_KHR);
        let mut surface = MockSurface::sized(800, 600);

        let result = scheduler.draw_frame(&mut backend, &mut surface);

        assert!(matches!(result, Err(VulkanError::Acquire(ash::vk::Result::ERROR_SURFACE_LOST_KHR))));
        assert_eq!(backend.submissions(), 0);
        assert!(backend.recreations().is_empty());
        assert_eq!(scheduler.state(), FrameState::Idle);
        assert_eq!(scheduler.frame_index(), 0);
    }

    #[test]
    fn test_present_failure_is_fatal_and_keeps_frame_index() {
        let (mut scheduler, _) = scheduler(3);
        let mut backend = MockBackend::new(3);
        let mut surface = MockSurface::sized(800, 600);
        scheduler.draw_frame(&mut backend, &mut surface).unwrap();
        assert_eq!(scheduler.frame_index(), 1);

        backend.present_error = Some(ash::vk::Result::ERROR_DEVICE_LOST);
        let result = scheduler.draw_frame(&mut backend, &mut surface);

        assert!(matches!(result, Err(VulkanError::Present(ash::vk::Result::ERROR_DEVICE_LOST))));
        assert_eq!(scheduler.frame_index(), 1);
        assert_eq!(scheduler.frames_presented(), 1);
        assert!(backend.recreations().is_empty());
        assert_eq!(scheduler.state(), FrameState::Idle);
    }
}
