pub mod allocation_run;
