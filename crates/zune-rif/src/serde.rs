/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "serde")]

use alloc::format;

use serde::ser::*;

use crate::header::{CRifHeader, RifHeader};

impl Serialize for RifHeader {
    #[allow(clippy::uninlined_format_args)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let mut state = serializer.serialize_struct("RifHeader", 4)?;

        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.serialize_field("has_alpha", &self.has_alpha)?;
        state.serialize_field("colorspace", &format!("{:?}", self.colorspace()))?;
        state.end()
    }
}

impl Serialize for CRifHeader {
    #[allow(clippy::uninlined_format_args)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let mut state = serializer.serialize_struct("CRifHeader", 8)?;

        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.serialize_field("has_alpha", &self.has_alpha)?;
        state.serialize_field("colorspace", &format!("{:?}", self.colorspace()))?;
        state.serialize_field("cell_cols", &self.cell_cols)?;
        state.serialize_field("cell_rows", &self.cell_rows)?;
        state.serialize_field("pattern_size", &self.pattern_size)?;
        state.serialize_field("number_of_patterns", &self.number_of_patterns)?;
        state.end()
    }
}
