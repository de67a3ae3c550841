// SPDX-License-Identifier: MPL-2.0

mod feed_item;
mod interaction;
mod mutator;
pub mod settings;
#[cfg(test)]
mod testing;

pub use feed_item::FeedItemViewModel;
pub use interaction::{Action, Direction, InteractionError, InteractionState, Toggle};
pub use mutator::{
    InteractionContext, Observer, OptimisticMutator, PendingMutation, SubscriptionId,
    ToggleOutcome,
};
pub use settings::{ClientSettings, SettingsError};
