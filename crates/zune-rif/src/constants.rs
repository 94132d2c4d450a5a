/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

/// alpha flag + width + height
pub const RIF_HEADER_SIZE: usize = 1 + 4 + 4;

/// raw header + cell columns + cell rows + pattern size + number of patterns
pub const CRIF_HEADER_SIZE: usize = RIF_HEADER_SIZE + 4 + 4 + 4 + 4;

/// Width in bytes of a single pattern index in the cell table
/// and of a single slot in a decoded cell table.
pub const CELL_INDEX_SIZE: usize = 4;

/// Value returned for coordinates outside an image
/// (opaque black)
pub const OUT_OF_BOUNDS_PIXEL: (u8, u8) = (0, 255);
