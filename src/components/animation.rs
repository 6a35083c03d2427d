//! Frame-list animations.
//!
//! An [`Animation`] is a list of images with durations plus a playhead.
//! The frame list is shared between clones; the playhead is not, so cloning
//! an animation always yields a copy that starts at its first frame.

use std::sync::Arc;

/// Reference to a drawable image.
///
/// `texture` is a key into [`TextureStore`](crate::resources::texturestore::TextureStore).
/// Mirrored and squashed variants share the texture of the original image;
/// the renderer applies the transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub texture: Arc<str>,
    pub width: i32,
    pub height: i32,
    /// Flipped horizontally.
    pub mirrored: bool,
    /// Drawn at half height, resting on the bottom edge.
    pub squashed: bool,
}

impl ImageRef {
    pub fn new(texture: impl Into<Arc<str>>, width: i32, height: i32) -> Self {
        ImageRef {
            texture: texture.into(),
            width,
            height,
            mirrored: false,
            squashed: false,
        }
    }

    pub fn mirrored(&self) -> Self {
        ImageRef {
            mirrored: !self.mirrored,
            ..self.clone()
        }
    }

    pub fn squashed(&self) -> Self {
        ImageRef {
            squashed: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
struct AnimFrame {
    image: ImageRef,
    /// Cumulative time at which this frame ends, in milliseconds.
    end_time: u64,
}

#[derive(Debug)]
pub struct Animation {
    frames: Arc<Vec<AnimFrame>>,
    frame_index: usize,
    anim_time: u64,
    total_duration: u64,
}

impl Default for Animation {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Animation {
    /// Shares the frames and restarts the playhead.
    fn clone(&self) -> Self {
        Animation {
            frames: Arc::clone(&self.frames),
            frame_index: 0,
            anim_time: 0,
            total_duration: self.total_duration,
        }
    }
}

impl Animation {
    pub fn new() -> Self {
        Animation {
            frames: Arc::new(Vec::new()),
            frame_index: 0,
            anim_time: 0,
            total_duration: 0,
        }
    }

    /// Builds an animation from `(image, duration_ms)` pairs.
    pub fn from_frames(frames: impl IntoIterator<Item = (ImageRef, u64)>) -> Self {
        let mut anim = Self::new();
        for (image, duration) in frames {
            anim.add_frame(image, duration);
        }
        anim
    }

    /// Appends a frame. Clones taken earlier keep their own frame list.
    pub fn add_frame(&mut self, image: ImageRef, duration: u64) {
        self.total_duration += duration;
        Arc::make_mut(&mut self.frames).push(AnimFrame {
            image,
            end_time: self.total_duration,
        });
    }

    /// Rewinds to the first frame.
    pub fn start(&mut self) {
        self.anim_time = 0;
        self.frame_index = 0;
    }

    /// Advances the playhead by `elapsed` milliseconds, wrapping at the end.
    pub fn update(&mut self, elapsed: u64) {
        if self.frames.len() <= 1 || self.total_duration == 0 {
            return;
        }
        self.anim_time += elapsed;
        if self.anim_time >= self.total_duration {
            self.anim_time %= self.total_duration;
            self.frame_index = 0;
        }
        while self.anim_time > self.frames[self.frame_index].end_time {
            self.frame_index += 1;
        }
    }

    /// Image of the current frame, or `None` for an empty animation.
    pub fn image(&self) -> Option<&ImageRef> {
        self.frames.get(self.frame_index).map(|f| &f.image)
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn total_duration(&self) -> u64 {
        self.total_duration
    }

    /// Applies `f` to every frame image, producing a new animation with the
    /// same timing. Used to derive mirrored and squashed variants.
    pub fn map_images(&self, f: impl Fn(&ImageRef) -> ImageRef) -> Animation {
        let mut anim = Animation::new();
        let mut last_end = 0;
        for frame in self.frames.iter() {
            anim.add_frame(f(&frame.image), frame.end_time - last_end);
            last_end = frame.end_time;
        }
        anim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(name: &str) -> ImageRef {
        ImageRef::new(name, 16, 16)
    }

    fn abc() -> Animation {
        Animation::from_frames([(img("a"), 100), (img("b"), 50), (img("c"), 200)])
    }

    fn current(anim: &Animation) -> &str {
        &anim.image().unwrap().texture
    }

    #[test]
    fn test_empty_animation_has_no_image() {
        let mut anim = Animation::new();
        anim.update(1000);
        assert!(anim.image().is_none());
        assert_eq!(anim.frame_count(), 0);
    }

    #[test]
    fn test_single_frame_never_advances() {
        let mut anim = Animation::from_frames([(img("only"), 150)]);
        anim.update(10_000);
        assert_eq!(current(&anim), "only");
        assert_eq!(anim.frame_index(), 0);
    }

    #[test]
    fn test_frame_boundaries() {
        let mut anim = abc();
        assert_eq!(anim.total_duration(), 350);
        anim.update(100);
        // exactly at the end time the frame is still current
        assert_eq!(current(&anim), "a");
        anim.update(1);
        assert_eq!(current(&anim), "b");
        anim.update(50);
        assert_eq!(current(&anim), "c");
    }

    #[test]
    fn test_wraps_to_first_frame() {
        let mut anim = abc();
        anim.update(349);
        assert_eq!(current(&anim), "c");
        anim.update(1);
        assert_eq!(anim.frame_index(), 0);
        anim.update(380);
        // 380 % 350 = 30
        assert_eq!(current(&anim), "a");
        anim.update(1000);
        // (30 + 1000) % 350 = 330
        assert_eq!(current(&anim), "c");
    }

    #[test]
    fn test_small_steps_visit_frames_in_order() {
        let mut anim = abc();
        let mut seen = vec![anim.frame_index()];
        for _ in 0..349 {
            anim.update(1);
            let idx = anim.frame_index();
            assert!(idx >= *seen.last().unwrap());
            if idx != *seen.last().unwrap() {
                seen.push(idx);
            }
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_clone_shares_frames_with_fresh_playhead() {
        let mut anim = abc();
        anim.update(200);
        let copy = anim.clone();
        assert_eq!(copy.frame_index(), 0);
        assert_eq!(copy.frame_count(), 3);
        assert_eq!(current(&anim), "c");
    }

    #[test]
    fn test_add_frame_after_clone_is_private() {
        let anim = abc();
        let mut longer = anim.clone();
        longer.add_frame(img("d"), 10);
        assert_eq!(anim.frame_count(), 3);
        assert_eq!(longer.frame_count(), 4);
        assert_eq!(longer.total_duration(), 360);
    }

    #[test]
    fn test_map_images_keeps_timing() {
        let mirrored = abc().map_images(ImageRef::mirrored);
        assert_eq!(mirrored.total_duration(), 350);
        assert!(mirrored.image().unwrap().mirrored);
        let squashed = mirrored.map_images(ImageRef::squashed);
        let first = squashed.image().unwrap();
        assert!(first.mirrored && first.squashed);
        assert_eq!(first.width, 16);
    }

    #[test]
    fn test_start_rewinds() {
        let mut anim = abc();
        anim.update(300);
        anim.start();
        assert_eq!(anim.frame_index(), 0);
    }
}
