use super::test_helpers::*;
use super::*;
use crate::error::{ConcurrencyError, Error, ValidationError};
use crate::types::{EnqueueOptions, Event};
use std::time::Duration;
