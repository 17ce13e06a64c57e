pub mod resiliency;
