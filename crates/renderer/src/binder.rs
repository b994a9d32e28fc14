use crate::types::{CHANNEL_COUNT, MAX_TEXTURES};

/// Identity of the texture bound to one sampler slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRef {
    /// The shared 1x1 neutral texture.
    Placeholder,
    /// Surface `surface` (0 or 1) of buffer pass `pass`'s target pair.
    Target { pass: usize, surface: usize },
    /// Shared texture asset slot.
    Asset { slot: usize },
}

pub type ChannelSet = [TextureRef; CHANNEL_COUNT];

pub const UNBOUND_CHANNELS: ChannelSet = [TextureRef::Placeholder; CHANNEL_COUNT];

/// Fixed wiring between passes.
///
/// `outputs[j]` is the front surface of buffer pass `j` at the moment of
/// binding. Because buffer passes render and swap strictly in order, entries
/// before the pass being bound already hold this tick's output, while the
/// pass's own entry still holds its previous-tick output.
pub struct ChannelBinder;

impl ChannelBinder {
    /// Channel 0 is the pass's own feedback; channel k reads buffer k-1 when
    /// that buffer comes earlier in the order.
    pub fn buffer_channels(index: usize, outputs: &[Option<usize>]) -> ChannelSet {
        let mut channels = UNBOUND_CHANNELS;
        channels[0] = target(index, outputs);
        for (channel, slot) in channels.iter_mut().enumerate().skip(1) {
            let producer = channel - 1;
            if producer < index {
                *slot = target(producer, outputs);
            }
        }
        channels
    }

    /// Channel k reads buffer k.
    pub fn final_channels(outputs: &[Option<usize>]) -> ChannelSet {
        let mut channels = UNBOUND_CHANNELS;
        for (channel, slot) in channels.iter_mut().enumerate() {
            *slot = target(channel, outputs);
        }
        channels
    }

    /// Shared asset slots; `ready[n]` tells whether slot n has a texture.
    pub fn asset_slots(ready: &[bool]) -> [TextureRef; MAX_TEXTURES] {
        std::array::from_fn(|slot| {
            if ready.get(slot).copied().unwrap_or(false) {
                TextureRef::Asset { slot }
            } else {
                TextureRef::Placeholder
            }
        })
    }
}

fn target(pass: usize, outputs: &[Option<usize>]) -> TextureRef {
    match outputs.get(pass).copied().flatten() {
        Some(surface) => TextureRef::Target { pass, surface },
        None => TextureRef::Placeholder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use super::TextureRef::{Placeholder, Target};

    #[test]
    fn first_tick_binds_placeholders_everywhere() {
        let outputs = [None, None, None];
        assert_eq!(ChannelBinder::buffer_channels(0, &outputs), UNBOUND_CHANNELS);
        assert_eq!(ChannelBinder::buffer_channels(2, &outputs), UNBOUND_CHANNELS);
    }

    #[test]
    fn earlier_buffers_feed_later_ones() {
        // bufferA and bufferB already swapped this tick; bufferC still shows last tick.
        let outputs = [Some(1), Some(0), Some(1)];
        assert_eq!(
            ChannelBinder::buffer_channels(2, &outputs),
            [
                Target { pass: 2, surface: 1 },
                Target { pass: 0, surface: 1 },
                Target { pass: 1, surface: 0 },
                Placeholder,
            ]
        );
    }

    #[test]
    fn later_buffers_are_never_visible() {
        let outputs = [Some(0), Some(0), Some(0), Some(0)];
        let channels = ChannelBinder::buffer_channels(0, &outputs);
        assert_eq!(channels[0], Target { pass: 0, surface: 0 });
        assert_eq!(&channels[1..], &[Placeholder; 3]);

        let channels = ChannelBinder::buffer_channels(1, &outputs);
        assert_eq!(channels[1], Target { pass: 0, surface: 0 });
        assert_eq!(channels[2], Placeholder);
    }

    #[test]
    fn final_pass_reads_first_four_buffers() {
        let outputs = [Some(1), None, Some(0), Some(1), Some(0)];
        assert_eq!(
            ChannelBinder::final_channels(&outputs),
            [
                Target { pass: 0, surface: 1 },
                Placeholder,
                Target { pass: 2, surface: 0 },
                Target { pass: 3, surface: 1 },
            ]
        );
        assert_eq!(ChannelBinder::final_channels(&[]), UNBOUND_CHANNELS);
    }

    #[test]
    fn asset_slots_fall_back_to_placeholder() {
        let slots = ChannelBinder::asset_slots(&[true, false, true]);
        assert_eq!(slots[0], TextureRef::Asset { slot: 0 });
        assert_eq!(slots[1], Placeholder);
        assert_eq!(slots[2], TextureRef::Asset { slot: 2 });
        assert!(slots[3..].iter().all(|slot| *slot == Placeholder));
    }
}
