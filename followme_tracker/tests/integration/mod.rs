mod closed_loop;
mod controller_rules;
mod pid_properties;
mod shutdown;
mod support;
mod tracking_loop;
