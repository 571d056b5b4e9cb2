//! Value propagation tests, from control edits to the field-change channel
//! and the model.
