//! Physical device scoring, MSAA and depth format choice
//!
//! Pure functions over data already queried from the driver, so the rules
//! can be tested without a GPU.

use ash::vk;

/// Everything the scorer needs to know about one physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// Discrete, integrated, virtual...
    pub device_type: vk::PhysicalDeviceType,
    /// `limits.maxImageDimension2D`
    pub max_image_dimension_2d: u32,
    /// Geometry shader feature support
    pub geometry_shader: bool,
    /// Anisotropic filtering support (the logical device enables it)
    pub sampler_anisotropy: bool,
    /// Both a graphics and a present queue family exist
    pub queue_families_complete: bool,
    /// `VK_KHR_swapchain` is available
    pub swapchain_extension: bool,
    /// Number of surface formats offered for the window surface
    pub format_count: usize,
    /// Number of present modes offered for the window surface
    pub present_mode_count: usize,
}

/// Suitability score; 0 means unusable
///
/// A discrete GPU earns 1000 on top of its maximum 2D image dimension.
pub fn score(candidate: &DeviceCandidate) -> u32 {
    let usable = candidate.geometry_shader
        && candidate.sampler_anisotropy
        && candidate.queue_families_complete
        && candidate.swapchain_extension
        && candidate.format_count > 0
        && candidate.present_mode_count > 0;
    if !usable {
        return 0;
    }

    let discrete_bonus = if candidate.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        1000
    } else {
        0
    };
    discrete_bonus + candidate.max_image_dimension_2d
}

/// Index of the highest nonzero score; the first enumerated device wins ties
pub fn pick_best(scores: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score == 0 {
            continue;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}

/// Graphics and present queue family indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// First family with graphics support
    pub graphics: Option<u32>,
    /// First family that can present to the surface
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Find the first graphics family and the first present-capable family
    ///
    /// `present_support[i]` is the surface support answer for family `i`.
    pub fn find(families: &[vk::QueueFamilyProperties], present_support: &[bool]) -> Self {
        let mut indices = Self::default();
        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }
            if indices.present.is_none() && present_support.get(index as usize).copied().unwrap_or(false) {
                indices.present = Some(index);
            }
            if indices.is_complete() {
                break;
            }
        }
        indices
    }

    /// Both families were found
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

const SAMPLE_COUNTS_DESCENDING: [vk::SampleCountFlags; 6] = [
    vk::SampleCountFlags::TYPE_64,
    vk::SampleCountFlags::TYPE_32,
    vk::SampleCountFlags::TYPE_16,
    vk::SampleCountFlags::TYPE_8,
    vk::SampleCountFlags::TYPE_4,
    vk::SampleCountFlags::TYPE_2,
];

/// Highest sample count supported by both colour and depth attachments
///
/// `cap` limits the result (e.g. `Some(4)` never picks 8x even if available).
pub fn select_msaa_samples(
    color_counts: vk::SampleCountFlags,
    depth_counts: vk::SampleCountFlags,
    cap: Option<u32>,
) -> vk::SampleCountFlags {
    let counts = color_counts & depth_counts;
    SAMPLE_COUNTS_DESCENDING
        .into_iter()
        .filter(|&count| cap.map_or(true, |cap| sample_count_value(count) <= cap))
        .find(|&count| counts.contains(count))
        .unwrap_or(vk::SampleCountFlags::TYPE_1)
}

/// Number of samples a single `SampleCountFlags` bit stands for
pub fn sample_count_value(samples: vk::SampleCountFlags) -> u32 {
    samples.as_raw().max(1)
}

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// First depth format that `supports_attachment` accepts
pub fn select_depth_format(supports_attachment: impl Fn(vk::Format) -> bool) -> Option<vk::Format> {
    DEPTH_FORMAT_CANDIDATES.into_iter().find(|&format| supports_attachment(format))
}

/// Whether a depth format also carries stencil bits
pub fn has_stencil_component(format: vk::Format) -> bool {
    format == vk::Format::D32_SFLOAT_S8_UINT || format == vk::Format::D24_UNORM_S8_UINT
}

/// Image aspect to use for views and barriers of a depth image
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    if has_stencil_component(format) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usable(device_type: vk::PhysicalDeviceType, max_dim: u32) -> DeviceCandidate {
        DeviceCandidate {
            device_type,
            max_image_dimension_2d: max_dim,
            geometry_shader: true,
            sampler_anisotropy: true,
            queue_families_complete: true,
            swapchain_extension: true,
            format_count: 2,
            present_mode_count: 1,
        }
    }

    #[test]
    fn test_discrete_gpu_gets_bonus() {
        assert_eq!(score(&usable(vk::PhysicalDeviceType::DISCRETE_GPU, 16384)), 17384);
        assert_eq!(score(&usable(vk::PhysicalDeviceType::INTEGRATED_GPU, 16384)), 16384);
    }

    #[test]
    fn test_missing_requirement_scores_zero() {
        let base = usable(vk::PhysicalDeviceType::DISCRETE_GPU, 8192);
        let broken = [
            DeviceCandidate { geometry_shader: false, ..base },
            DeviceCandidate { sampler_anisotropy: false, ..base },
            DeviceCandidate { queue_families_complete: false, ..base },
            DeviceCandidate { swapchain_extension: false, ..base },
            DeviceCandidate { format_count: 0, ..base },
            DeviceCandidate { present_mode_count: 0, ..base },
        ];
        for candidate in &broken {
            assert_eq!(score(candidate), 0, "{candidate:?}");
        }
    }

    #[test]
    fn test_pick_best_prefers_highest_then_first() {
        assert_eq!(pick_best(&[100, 300, 200]), Some(1));
        assert_eq!(pick_best(&[300, 300]), Some(0));
        assert_eq!(pick_best(&[0, 5, 5]), Some(1));
        assert_eq!(pick_best(&[0, 0]), None);
        assert_eq!(pick_best(&[]), None);
    }

    #[test]
    fn test_queue_families_first_match() {
        let graphics = vk::QueueFamilyProperties {
            queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
            ..Default::default()
        };
        let transfer_only = vk::QueueFamilyProperties {
            queue_flags: vk::QueueFlags::TRANSFER,
            ..Default::default()
        };

        let indices = QueueFamilyIndices::find(&[transfer_only, graphics, graphics], &[true, false, true]);
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(0));
        assert!(indices.is_complete());

        let no_present = QueueFamilyIndices::find(&[graphics], &[false]);
        assert!(!no_present.is_complete());
    }

    #[test]
    fn test_msaa_uses_common_maximum() {
        let color = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4
            | vk::SampleCountFlags::TYPE_8;
        let depth = vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2 | vk::SampleCountFlags::TYPE_4;
        assert_eq!(select_msaa_samples(color, depth, None), vk::SampleCountFlags::TYPE_4);
        assert_eq!(select_msaa_samples(color, depth, Some(2)), vk::SampleCountFlags::TYPE_2);
        assert_eq!(
            select_msaa_samples(vk::SampleCountFlags::TYPE_1, depth, None),
            vk::SampleCountFlags::TYPE_1
        );
        assert_eq!(select_msaa_samples(color, depth, Some(1)), vk::SampleCountFlags::TYPE_1);
    }

    #[test]
    fn test_sample_count_value() {
        assert_eq!(sample_count_value(vk::SampleCountFlags::TYPE_1), 1);
        assert_eq!(sample_count_value(vk::SampleCountFlags::TYPE_8), 8);
        assert_eq!(sample_count_value(vk::SampleCountFlags::TYPE_64), 64);
    }

    #[test]
    fn test_depth_format_preference_order() {
        assert_eq!(select_depth_format(|_| true), Some(vk::Format::D32_SFLOAT));
        assert_eq!(
            select_depth_format(|f| f == vk::Format::D24_UNORM_S8_UINT),
            Some(vk::Format::D24_UNORM_S8_UINT)
        );
        assert_eq!(select_depth_format(|_| false), None);
    }

    #[test]
    fn test_stencil_formats_get_stencil_aspect() {
        assert_eq!(depth_aspect(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert!(depth_aspect(vk::Format::D24_UNORM_S8_UINT).contains(vk::ImageAspectFlags::STENCIL));
        assert!(has_stencil_component(vk::Format::D32_SFLOAT_S8_UINT));
        assert!(!has_stencil_component(vk::Format::D32_SFLOAT));
    }
}
