//! Array field tests: incremental add/remove and full resets.

mod add_remove;
mod reset;
