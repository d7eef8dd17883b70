// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/frame.rs - CLIP 像素张量帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{DynamicImage, GenericImageView, imageops::FilterType};
use ndarray::Array4;

const RGB_CHANNELS: usize = 3;

pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

pub const CLIP_INPUT_SIZE: u32 = 224;

/// CLIP 模型输入帧，NCHW 排布，已归一化的 f32 数据
pub type ClipFrame = ClipPixelFrame<CLIP_INPUT_SIZE, CLIP_INPUT_SIZE>;

#[derive(Debug, Clone)]
pub struct ClipPixelFrame<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> Default for ClipPixelFrame<W, H> {
  fn default() -> Self {
    let size = RGB_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0f32; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> ClipPixelFrame<W, H> {
  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_nchw(&self) -> &[f32] {
    &self.data
  }

  /// 转换为 `[1, 3, H, W]` 张量
  pub fn to_array(&self) -> Array4<f32> {
    Array4::from_shape_fn(
      (1, RGB_CHANNELS, H as usize, W as usize),
      |(_, c, h, w)| self.data[c * (H as usize) * (W as usize) + h * (W as usize) + w],
    )
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for ClipPixelFrame<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

/// 短边缩放到 `target`，长边按比例向下取整
fn resized_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
  let shortest = width.min(height).max(1) as u64;
  let scale = |side: u32| (target as u64 * side as u64 / shortest) as u32;
  (scale(width), scale(height))
}

/// 短边缩放到目标尺寸（双三次插值），再中心裁剪
fn resize_and_crop<const W: u32, const H: u32>(image: &DynamicImage) -> image::RgbImage {
  let (width, height) = image.dimensions();
  let (new_w, new_h) = resized_dimensions(width, height, W.max(H));
  let (new_w, new_h) = (new_w.max(W), new_h.max(H));

  let resized = if new_w == width && new_h == height {
    image.clone()
  } else {
    image.resize_exact(new_w, new_h, FilterType::CatmullRom)
  };

  let left = (new_w - W) / 2;
  let top = (new_h - H) / 2;
  resized.crop_imm(left, top, W, H).to_rgb8()
}

impl<const W: u32, const H: u32> From<&DynamicImage> for ClipPixelFrame<W, H> {
  fn from(image: &DynamicImage) -> Self {
    let cropped = resize_and_crop::<W, H>(image);

    let mut frame = Self::default();
    let channels = frame.channels();
    let height = frame.height();
    let width = frame.width();
    let slice = frame.as_mut();

    for c in 0..channels {
      for h in 0..height {
        for w in 0..width {
          let pixel = cropped.get_pixel(w as u32, h as u32);
          let value = pixel[c] as f32 / 255.0;
          let index = c * height * width + h * width + w;
          slice[index] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
        }
      }
    }
    frame
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn solid_color_is_normalized_per_channel() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([255, 0, 128])));
    let frame = ClipPixelFrame::<8, 8>::from(&image);
    let plane = 8 * 8;
    let data = frame.as_nchw();
    assert_eq!(data.len(), 3 * plane);

    let expect = |c: usize, v: f32| (v / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
    assert!((data[0] - expect(0, 255.0)).abs() < 2e-2);
    assert!((data[plane] - expect(1, 0.0)).abs() < 2e-2);
    assert!((data[2 * plane + 5] - expect(2, 128.0)).abs() < 2e-2);
  }

  #[test]
  fn wide_image_is_center_cropped() {
    let mut image = RgbImage::from_pixel(30, 10, Rgb([0, 0, 0]));
    for y in 0..10 {
      for x in 10..20 {
        image.put_pixel(x, y, Rgb([255, 255, 255]));
      }
    }
    let cropped = resize_and_crop::<10, 10>(&DynamicImage::ImageRgb8(image));
    assert_eq!(cropped.dimensions(), (10, 10));
    assert_eq!(cropped.get_pixel(5, 5), &Rgb([255, 255, 255]));
  }

  #[test]
  fn long_side_is_truncated_not_rounded() {
    // 224 * 333 / 100 = 745.92
    assert_eq!(resized_dimensions(333, 100, 224), (745, 224));
    assert_eq!(resized_dimensions(100, 333, 224), (224, 745));
    assert_eq!(resized_dimensions(640, 480, 224), (298, 224));
    assert_eq!(resized_dimensions(224, 224, 224), (224, 224));
  }

  #[test]
  fn array_layout_matches_slice() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(4, 4, |x, y| {
      Rgb([(x * 40) as u8, (y * 40) as u8, 7])
    }));
    let frame = ClipPixelFrame::<4, 4>::from(&image);
    let array = frame.to_array();
    assert_eq!(array.shape(), &[1, 3, 4, 4]);
    assert_eq!(array[[0, 1, 2, 3]], frame.as_nchw()[16 + 2 * 4 + 3]);
  }

  #[test]
  fn small_image_is_upscaled() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 3, Rgb([10, 20, 30])));
    let cropped = resize_and_crop::<CLIP_INPUT_SIZE, CLIP_INPUT_SIZE>(&image);
    assert_eq!(cropped.dimensions(), (CLIP_INPUT_SIZE, CLIP_INPUT_SIZE));
  }
}
