// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with:
// - Value objects
// - Commands
// - Errors
// - Aggregate implementation and validation
// - Repository contract
// - Service
//
// This layer knows nothing about HTTP or the storage engine.
//
// ============================================================================

pub mod order;
