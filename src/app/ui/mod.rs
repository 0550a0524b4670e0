mod controls;
mod notices;
mod panels;
