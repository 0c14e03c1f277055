mod activity_lifecycle_steps;
mod board_traversal_steps;
mod child_orchestration_steps;
mod listener_dispatch_steps;
