mod sweep_control;
