use super::container::ArrayInfo;
use super::extract::ExtractError;

/// Channel counts accepted for image tensors.
pub const IMAGE_CHANNELS: [u64; 3] = [1, 3, 4];

/// Which arrays of a container hold the images and, optionally, the labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRoles {
    pub images: ArrayInfo,
    pub labels: Option<ArrayInfo>,
}

/// True for `u8` arrays shaped `[N, H, W, C]` with `C` in [`IMAGE_CHANNELS`].
pub fn looks_like_images(info: &ArrayInfo) -> bool {
    info.element.is_u8()
        && info.rank() == 4
        && info
            .shape
            .last()
            .is_some_and(|channels| IMAGE_CHANNELS.contains(channels))
}

/// True for rank-1 integer arrays.
pub fn looks_like_labels(info: &ArrayInfo) -> bool {
    info.rank() == 1 && info.element.is_integer()
}

/// Pick the image array and the optional label array.
///
/// The image array is the first one that [`looks_like_images`], falling back
/// to the first array so that shape problems surface per sample.
pub fn classify_arrays(arrays: &[ArrayInfo]) -> Result<ArrayRoles, ExtractError> {
    let images = arrays
        .iter()
        .find(|info| looks_like_images(info))
        .or_else(|| arrays.first())
        .ok_or(ExtractError::EmptyContainer)?
        .clone();
    let labels = arrays
        .iter()
        .filter(|info| info.name != images.name)
        .find(|info| looks_like_labels(info))
        .cloned();
    Ok(ArrayRoles { images, labels })
}
